// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound webhook integrations.
//!
//! ```toml
//! [[plugins]]
//! name = "cloudflare"
//! route = "cloudflare"
//! kind = "cloudflare"
//! auth_mode = "plain_header_weak"
//! auth_header = "cf-webhook-auth"
//! secret_env = "HERALD_PLUGIN_CLOUDFLARE_SECRET"
//! settings = { chat_id = "19:ops@thread.v2" }
//! ```

use std::collections::HashSet;

use herald_common_secret::{load_secret_env, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Routes served by Herald itself.
pub const RESERVED_ROUTES: &[&str] = &["chat", "callback", "test", "health"];

/// How a plugin's webhooks are authenticated.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PluginAuthMode {
	/// HMAC-SHA256 of the body, hex encoded, in `auth_header`.
	#[default]
	Hmac,
	/// `auth_header` must equal the secret. For providers that cannot sign.
	PlainHeaderWeak,
}

/// One `[[plugins]]` entry as written.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfigLayer {
	pub name: String,
	#[serde(default)]
	pub route: Option<String>,
	pub kind: String,
	#[serde(default)]
	pub auth_mode: PluginAuthMode,
	pub auth_header: String,
	#[serde(default)]
	pub secret: Option<SecretString>,
	/// Environment variable holding the secret instead of the file.
	#[serde(default)]
	pub secret_env: Option<String>,
	#[serde(default)]
	pub settings: Map<String, Value>,
}

impl PluginConfigLayer {
	pub fn finalize(self) -> Result<PluginConfig, ConfigError> {
		let route = self
			.route
			.unwrap_or_else(|| self.name.clone())
			.trim_matches('/')
			.to_string();

		let secret = match (self.secret, &self.secret_env) {
			(_, Some(var)) => load_secret_env(var)
				.map_err(|e| ConfigError::Secret(e.to_string()))?
				.ok_or_else(|| {
					ConfigError::validation(format!("plugin '{}': {var} is not set", self.name))
				})?,
			(Some(secret), None) => secret,
			(None, None) => {
				return Err(ConfigError::validation(format!(
					"plugin '{}' has no secret",
					self.name
				)))
			}
		};

		Ok(PluginConfig {
			name: self.name,
			route,
			kind: self.kind,
			auth_mode: self.auth_mode,
			auth_header: self.auth_header,
			secret,
			settings: self.settings,
		})
	}
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
	pub name: String,
	/// Path segment the plugin's webhooks are posted to, without slashes.
	pub route: String,
	pub kind: String,
	pub auth_mode: PluginAuthMode,
	pub auth_header: String,
	pub secret: SecretString,
	pub settings: Map<String, Value>,
}

pub fn finalize_plugins(layers: Vec<PluginConfigLayer>) -> Result<Vec<PluginConfig>, ConfigError> {
	let plugins = layers
		.into_iter()
		.map(PluginConfigLayer::finalize)
		.collect::<Result<Vec<_>, _>>()?;
	validate_plugins(&plugins)?;
	Ok(plugins)
}

fn validate_plugins(plugins: &[PluginConfig]) -> Result<(), ConfigError> {
	let mut routes = HashSet::new();
	for plugin in plugins {
		if plugin.route.is_empty() {
			return Err(ConfigError::validation(format!(
				"plugin '{}' has an empty route",
				plugin.name
			)));
		}
		if RESERVED_ROUTES.contains(&plugin.route.as_str()) {
			return Err(ConfigError::validation(format!(
				"plugin '{}' uses reserved route '/{}'",
				plugin.name, plugin.route
			)));
		}
		if !routes.insert(plugin.route.as_str()) {
			return Err(ConfigError::validation(format!(
				"route '/{}' is used by more than one plugin",
				plugin.route
			)));
		}
		if plugin.auth_header.trim().is_empty() {
			return Err(ConfigError::validation(format!(
				"plugin '{}' has an empty auth_header",
				plugin.name
			)));
		}
		if plugin.secret.is_empty() {
			return Err(ConfigError::validation(format!(
				"plugin '{}' has an empty secret",
				plugin.name
			)));
		}
	}
	Ok(())
}
