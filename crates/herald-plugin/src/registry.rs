// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The capability interface and the startup-built registration table.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::auth::{AuthOutcome, AuthPolicy};
use crate::error::{PluginError, Result};

/// What an integration can do.
#[async_trait]
pub trait Plugin: Send + Sync {
	fn kind(&self) -> &'static str;

	/// Checks a webhook before [`Plugin::handle_event`] sees it. Defaults to
	/// the registration's policy.
	fn authenticate(&self, policy: &AuthPolicy, headers: &HeaderMap, body: &[u8]) -> AuthOutcome {
		policy.authenticate(headers, body)
	}

	/// Process an authenticated event. `source` is the sender's address when known.
	async fn handle_event(&self, event: Value, source: Option<IpAddr>) -> Result<()>;

	/// Run a scheduled task by name. Kinds without tasks reject every name.
	async fn run_task(&self, task: &str, _args: &Map<String, Value>) -> Result<()> {
		Err(PluginError::UnknownTask {
			kind: self.kind().to_string(),
			task: task.to_string(),
		})
	}
}

/// One configured integration bound to a route.
#[derive(Clone)]
pub struct PluginRegistration {
	pub name: String,
	pub route: String,
	pub policy: AuthPolicy,
	pub handler: Arc<dyn Plugin>,
}

impl PluginRegistration {
	pub fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> AuthOutcome {
		self.handler.authenticate(&self.policy, headers, body)
	}
}

impl std::fmt::Debug for PluginRegistration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PluginRegistration")
			.field("name", &self.name)
			.field("route", &self.route)
			.field("kind", &self.handler.kind())
			.field("auth_mode", &self.policy.mode())
			.finish()
	}
}

/// Registrations keyed by route. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
	by_route: HashMap<String, PluginRegistration>,
}

impl PluginRegistry {
	pub fn new(registrations: Vec<PluginRegistration>) -> Result<Self> {
		let mut by_route = HashMap::with_capacity(registrations.len());
		for registration in registrations {
			let route = normalize_route(&registration.route);
			if by_route.contains_key(&route) {
				return Err(PluginError::DuplicateRoute(route));
			}
			if registration.policy.is_weak() {
				warn!(
					plugin = %registration.name,
					route = %route,
					"plugin uses plain_header_weak authentication; bodies are not integrity checked"
				);
			}
			info!(
				plugin = %registration.name,
				route = %route,
				kind = registration.handler.kind(),
				"registered plugin"
			);
			by_route.insert(route, registration);
		}
		Ok(Self { by_route })
	}

	pub fn get(&self, route: &str) -> Option<&PluginRegistration> {
		self.by_route.get(&normalize_route(route))
	}

	/// Look a registration up by its configured name rather than its route.
	pub fn by_name(&self, name: &str) -> Option<&PluginRegistration> {
		self.by_route.values().find(|r| r.name == name)
	}

	pub fn len(&self) -> usize {
		self.by_route.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_route.is_empty()
	}

	pub fn routes(&self) -> impl Iterator<Item = &str> {
		self.by_route.keys().map(String::as_str)
	}
}

fn normalize_route(route: &str) -> String {
	route.trim_matches('/').to_string()
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::auth::AuthMode;
	use std::sync::Mutex;

	#[derive(Default)]
	pub(crate) struct RecordingPlugin {
		pub events: Mutex<Vec<(Value, Option<IpAddr>)>>,
	}

	#[async_trait]
	impl Plugin for RecordingPlugin {
		fn kind(&self) -> &'static str {
			"recording"
		}

		async fn handle_event(&self, event: Value, source: Option<IpAddr>) -> Result<()> {
			self.events.lock().unwrap().push((event, source));
			Ok(())
		}
	}

	struct AlwaysAllow;

	#[async_trait]
	impl Plugin for AlwaysAllow {
		fn kind(&self) -> &'static str {
			"always_allow"
		}

		fn authenticate(&self, _: &AuthPolicy, _: &HeaderMap, _: &[u8]) -> AuthOutcome {
			AuthOutcome::Authenticated
		}

		async fn handle_event(&self, _: Value, _: Option<IpAddr>) -> Result<()> {
			Ok(())
		}
	}

	fn registration(name: &str, route: &str, handler: Arc<dyn Plugin>) -> PluginRegistration {
		PluginRegistration {
			name: name.into(),
			route: route.into(),
			policy: AuthPolicy::new(AuthMode::Hmac, "x-sig", "secret".into()),
			handler,
		}
	}

	#[test]
	fn routes_are_looked_up_without_slashes() {
		let registry = PluginRegistry::new(vec![registration(
			"cf",
			"/cloudflare/",
			Arc::new(RecordingPlugin::default()),
		)])
		.unwrap();

		assert!(registry.get("cloudflare").is_some());
		assert!(registry.get("/cloudflare").is_some());
		assert!(registry.get("junos").is_none());
		assert_eq!(registry.by_name("cf").unwrap().route, "/cloudflare/");
		assert!(registry.by_name("cloudflare").is_none());
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn duplicate_routes_are_rejected() {
		let result = PluginRegistry::new(vec![
			registration("a", "alerts", Arc::new(RecordingPlugin::default())),
			registration("b", "/alerts", Arc::new(RecordingPlugin::default())),
		]);
		assert!(matches!(result, Err(PluginError::DuplicateRoute(r)) if r == "alerts"));
	}

	#[test]
	fn default_authenticate_uses_the_policy() {
		let registry = PluginRegistry::new(vec![registration(
			"cf",
			"cloudflare",
			Arc::new(RecordingPlugin::default()),
		)])
		.unwrap();
		let outcome = registry.get("cloudflare").unwrap().authenticate(&HeaderMap::new(), b"{}");
		assert_eq!(outcome, AuthOutcome::HeaderMissing);
	}

	#[test]
	fn plugins_can_override_authenticate() {
		let registration = registration("open", "open", Arc::new(AlwaysAllow));
		assert_eq!(
			registration.authenticate(&HeaderMap::new(), b"{}"),
			AuthOutcome::Authenticated
		);
	}

	#[tokio::test]
	async fn plugins_without_tasks_reject_them() {
		let err = RecordingPlugin::default()
			.run_task("rotate", &Map::new())
			.await
			.unwrap_err();
		assert!(matches!(err, PluginError::UnknownTask { kind, task } if kind == "recording" && task == "rotate"));
	}

	#[tokio::test]
	async fn events_reach_the_handler() {
		let plugin = Arc::new(RecordingPlugin::default());
		let registry =
			PluginRegistry::new(vec![registration("cf", "cloudflare", plugin.clone())]).unwrap();

		let source: IpAddr = "203.0.113.9".parse().unwrap();
		registry
			.get("cloudflare")
			.unwrap()
			.handler
			.handle_event(serde_json::json!({"ok": true}), Some(source))
			.await
			.unwrap();

		let events = plugin.events.lock().unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].1, Some(source));
	}
}
