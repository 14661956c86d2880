// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolves configured plugin kinds to implementations at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use herald_common_secret::SecretString;
use serde_json::{Map, Value};

use crate::auth::{AuthMode, AuthPolicy};
use crate::builtin::{CloudflarePlugin, LogPlugin};
use crate::error::{PluginError, Result};
use crate::registry::{Plugin, PluginRegistration, PluginRegistry};

/// Outbound chat delivery used by plugins that raise alerts.
#[async_trait]
pub trait ChatSender: Send + Sync {
	async fn send_chat(&self, chat_id: &str, html: &str) -> Result<()>;
}

/// One plugin as written in configuration.
#[derive(Debug, Clone)]
pub struct PluginDefinition {
	pub name: String,
	pub route: String,
	pub kind: String,
	pub auth_mode: AuthMode,
	pub auth_header: String,
	pub secret: SecretString,
	/// Kind-specific settings, such as the chat an alert plugin posts to.
	pub settings: Map<String, Value>,
}

impl PluginDefinition {
	pub fn setting_str(&self, key: &str) -> Option<&str> {
		self.settings.get(key).and_then(Value::as_str)
	}

	pub fn require_setting(&self, key: &str) -> Result<String> {
		self.setting_str(key)
			.filter(|v| !v.is_empty())
			.map(str::to_string)
			.ok_or_else(|| PluginError::invalid(&self.name, format!("missing setting '{key}'")))
	}
}

/// Shared services handed to plugin constructors.
#[derive(Clone, Default)]
pub struct PluginContext {
	pub chat: Option<Arc<dyn ChatSender>>,
}

impl PluginContext {
	pub fn chat_sender(&self, plugin: &str) -> Result<Arc<dyn ChatSender>> {
		self.chat
			.clone()
			.ok_or_else(|| PluginError::invalid(plugin, "chat delivery is not configured"))
	}
}

type Constructor = Box<dyn Fn(&PluginDefinition, &PluginContext) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// Table from kind name to constructor.
pub struct PluginFactory {
	constructors: HashMap<&'static str, Constructor>,
}

impl PluginFactory {
	pub fn empty() -> Self {
		Self {
			constructors: HashMap::new(),
		}
	}

	/// Factory with the bundled `log` and `cloudflare` kinds.
	pub fn with_builtins() -> Self {
		let mut factory = Self::empty();
		factory.register(LogPlugin::KIND, |definition, _| {
			let plugin: Arc<dyn Plugin> = Arc::new(LogPlugin::new(&definition.name));
			Ok(plugin)
		});
		factory.register(CloudflarePlugin::KIND, |definition, context| {
			let chat_id = definition.require_setting("chat_id")?;
			let sender = context.chat_sender(&definition.name)?;
			let plugin: Arc<dyn Plugin> = Arc::new(CloudflarePlugin::new(chat_id, sender));
			Ok(plugin)
		});
		factory
	}

	pub fn register<F>(&mut self, kind: &'static str, constructor: F)
	where
		F: Fn(&PluginDefinition, &PluginContext) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
	{
		self.constructors.insert(kind, Box::new(constructor));
	}

	pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.constructors.keys().copied()
	}

	/// Construct every definition and assemble the registry.
	pub fn build(
		&self,
		definitions: &[PluginDefinition],
		context: &PluginContext,
	) -> Result<PluginRegistry> {
		let mut registrations = Vec::with_capacity(definitions.len());
		for definition in definitions {
			registrations.push(self.build_one(definition, context)?);
		}
		PluginRegistry::new(registrations)
	}

	fn build_one(
		&self,
		definition: &PluginDefinition,
		context: &PluginContext,
	) -> Result<PluginRegistration> {
		if definition.auth_header.trim().is_empty() {
			return Err(PluginError::invalid(&definition.name, "auth_header must be set"));
		}
		if definition.secret.is_empty() {
			return Err(PluginError::invalid(&definition.name, "secret must be set"));
		}

		let constructor =
			self.constructors
				.get(definition.kind.as_str())
				.ok_or_else(|| PluginError::UnknownKind {
					name: definition.name.clone(),
					kind: definition.kind.clone(),
				})?;

		Ok(PluginRegistration {
			name: definition.name.clone(),
			route: definition.route.clone(),
			policy: AuthPolicy::new(
				definition.auth_mode,
				definition.auth_header.trim(),
				definition.secret.clone(),
			),
			handler: constructor(definition, context)?,
		})
	}
}

impl Default for PluginFactory {
	fn default() -> Self {
		Self::with_builtins()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::tests::RecordingPlugin;

	fn definition(name: &str, route: &str, kind: &str) -> PluginDefinition {
		PluginDefinition {
			name: name.into(),
			route: route.into(),
			kind: kind.into(),
			auth_mode: AuthMode::Hmac,
			auth_header: "x-signature".into(),
			secret: "secret".into(),
			settings: Map::new(),
		}
	}

	struct NullSender;

	#[async_trait]
	impl ChatSender for NullSender {
		async fn send_chat(&self, _: &str, _: &str) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn builds_builtin_kinds() {
		let mut cf = definition("cloudflare", "cloudflare", "cloudflare");
		cf.auth_mode = AuthMode::PlainHeaderWeak;
		cf.settings.insert("chat_id".into(), Value::String("19:ops".into()));
		let context = PluginContext {
			chat: Some(Arc::new(NullSender)),
		};

		let registry = PluginFactory::with_builtins()
			.build(&[definition("audit", "audit", "log"), cf], &context)
			.unwrap();

		assert_eq!(registry.len(), 2);
		assert_eq!(registry.get("audit").unwrap().handler.kind(), "log");
		assert!(registry.get("cloudflare").unwrap().policy.is_weak());
	}

	#[test]
	fn unknown_kind_is_rejected() {
		let result = PluginFactory::with_builtins()
			.build(&[definition("x", "x", "junos")], &PluginContext::default());
		assert!(matches!(result, Err(PluginError::UnknownKind { kind, .. }) if kind == "junos"));
	}

	#[test]
	fn empty_auth_header_is_rejected() {
		let mut def = definition("x", "x", "log");
		def.auth_header = " ".into();
		let result = PluginFactory::with_builtins().build(&[def], &PluginContext::default());
		assert!(matches!(result, Err(PluginError::InvalidDefinition { .. })));
	}

	#[test]
	fn empty_secret_is_rejected() {
		let mut def = definition("x", "x", "log");
		def.secret = "".into();
		let result = PluginFactory::with_builtins().build(&[def], &PluginContext::default());
		assert!(matches!(result, Err(PluginError::InvalidDefinition { .. })));
	}

	#[test]
	fn cloudflare_needs_chat_id_and_sender() {
		let def = definition("cf", "cf", "cloudflare");
		let with_sender = PluginContext {
			chat: Some(Arc::new(NullSender)),
		};
		assert!(PluginFactory::with_builtins().build(&[def.clone()], &with_sender).is_err());

		let mut def = def;
		def.settings.insert("chat_id".into(), Value::String("19:ops".into()));
		assert!(PluginFactory::with_builtins()
			.build(&[def], &PluginContext::default())
			.is_err());
	}

	#[test]
	fn custom_kinds_can_be_registered() {
		let mut factory = PluginFactory::empty();
		factory.register("recording", |_, _| {
			let plugin: Arc<dyn Plugin> = Arc::new(RecordingPlugin::default());
			Ok(plugin)
		});
		assert_eq!(factory.kinds().collect::<Vec<_>>(), ["recording"]);

		let registry = factory
			.build(&[definition("r", "r", "recording")], &PluginContext::default())
			.unwrap();
		assert_eq!(registry.get("r").unwrap().handler.kind(), "recording");
	}
}
