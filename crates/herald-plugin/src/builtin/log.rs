// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{PluginError, Result};
use crate::registry::Plugin;

/// Records each event's top-level keys and size. Useful while wiring up a
/// new integration. Its one task, `log`, records the task's arguments, which
/// makes it a heartbeat for checking a schedule.
pub struct LogPlugin {
	name: String,
}

impl LogPlugin {
	pub const KIND: &'static str = "log";

	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
		}
	}
}

#[async_trait]
impl Plugin for LogPlugin {
	fn kind(&self) -> &'static str {
		Self::KIND
	}

	async fn handle_event(&self, event: Value, source: Option<IpAddr>) -> Result<()> {
		let keys: Vec<&str> = event
			.as_object()
			.map(|o| o.keys().map(String::as_str).collect())
			.unwrap_or_default();
		info!(
			plugin = %self.name,
			source = ?source,
			keys = ?keys,
			bytes = event.to_string().len(),
			"webhook event received"
		);
		Ok(())
	}

	async fn run_task(&self, task: &str, args: &Map<String, Value>) -> Result<()> {
		if task != "log" {
			return Err(PluginError::UnknownTask {
				kind: Self::KIND.to_string(),
				task: task.to_string(),
			});
		}
		info!(plugin = %self.name, args = %serde_json::Value::Object(args.clone()), "scheduled task ran");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn accepts_any_json() {
		let plugin = LogPlugin::new("audit");
		plugin.handle_event(serde_json::json!({"a": 1}), None).await.unwrap();
		plugin.handle_event(serde_json::json!([1, 2]), None).await.unwrap();
		assert_eq!(plugin.kind(), "log");
	}

	#[tokio::test]
	async fn log_is_the_only_task() {
		let plugin = LogPlugin::new("audit");
		let mut args = Map::new();
		args.insert("note".into(), Value::String("nightly".into()));
		plugin.run_task("log", &args).await.unwrap();
		assert!(matches!(
			plugin.run_task("collect", &args).await,
			Err(PluginError::UnknownTask { .. })
		));
	}
}
