// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cloudflare notification webhooks.
//!
//! Cloudflare cannot sign webhooks; it sends a configured secret in
//! `cf-webhook-auth`, so this plugin is normally registered with
//! `plain_header_weak` authentication.
//!
//! The `post_message` task posts `args.message` to the same chat, for
//! scheduled reminders next to the alerts.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{PluginError, Result};
use crate::factory::ChatSender;
use crate::registry::Plugin;

/// Posts load-balancer and origin health alerts to a chat.
pub struct CloudflarePlugin {
	chat_id: String,
	chat: Arc<dyn ChatSender>,
}

/// Fields pulled from the `data` object of a notification.
#[derive(Debug, Default, PartialEq, Eq)]
struct AlertFields {
	alert_type: Option<String>,
	time: Option<String>,
	pool: Option<String>,
	service: Option<String>,
	health: Option<String>,
	reason: Option<String>,
}

impl CloudflarePlugin {
	pub const KIND: &'static str = "cloudflare";

	pub fn new(chat_id: String, chat: Arc<dyn ChatSender>) -> Self {
		Self { chat_id, chat }
	}

	fn fields(event: &Value) -> AlertFields {
		let data = &event["data"];
		let text = |v: &Value| v.as_str().map(str::to_string);

		AlertFields {
			alert_type: text(&event["alert_type"]),
			time: text(&data["timestamp"])
				.or_else(|| text(&data["time"]))
				.and_then(|t| local_time(&t)),
			pool: text(&data["pool_name"]),
			service: text(&data["origin_name"]).or_else(|| text(&data["name"])),
			health: text(&data["new_health"]).or_else(|| text(&data["status"])),
			reason: text(&data["origin_failure_reason"]).or_else(|| text(&data["reason"])),
		}
	}

	fn messages(event: &Value) -> Vec<String> {
		let fields = Self::fields(event);
		let mut messages = Vec::with_capacity(2);

		match &fields.alert_type {
			Some(alert_type) => messages.push(format!(
				"<b><span style=\"color:Yellow\">{}</span></b> on <b><span style=\"color:Orange\">{}</span></b> at {}",
				escape(alert_type),
				escape(fields.pool.as_deref().unwrap_or("unknown pool")),
				fields.time.as_deref().unwrap_or("no timestamp"),
			)),
			None => messages.push(format!("Cloudflare event: {}", escape(&event["data"].to_string()))),
		}

		if let Some(health) = &fields.health {
			let colour = if health == "Healthy" { "Lime" } else { "Red" };
			let mut line = format!(
				"Current status for <b><span style=\"color:Orange\">{}</span></b> is <b><span style=\"color:{colour}\">{}</span></b>",
				escape(fields.service.as_deref().unwrap_or("unknown service")),
				escape(health),
			);
			if let Some(reason) = fields.reason.as_deref().filter(|r| !r.is_empty()) {
				line.push_str(&format!(" ({})", escape(reason)));
			}
			messages.push(line);
		}

		messages
	}
}

#[async_trait]
impl Plugin for CloudflarePlugin {
	fn kind(&self) -> &'static str {
		Self::KIND
	}

	#[instrument(skip(self, event), fields(chat_id = %self.chat_id))]
	async fn handle_event(&self, event: Value, source: Option<IpAddr>) -> Result<()> {
		if !event.is_object() {
			return Err(PluginError::MalformedEvent("expected a JSON object".into()));
		}
		debug!(source = ?source, "cloudflare notification");

		for message in Self::messages(&event) {
			self.chat.send_chat(&self.chat_id, &message).await?;
		}
		Ok(())
	}

	async fn run_task(&self, task: &str, args: &Map<String, Value>) -> Result<()> {
		if task != "post_message" {
			return Err(PluginError::UnknownTask {
				kind: Self::KIND.to_string(),
				task: task.to_string(),
			});
		}
		let message = args
			.get("message")
			.and_then(Value::as_str)
			.filter(|m| !m.is_empty())
			.ok_or_else(|| PluginError::InvalidTaskArgs {
				task: task.to_string(),
				message: "'message' must be a non-empty string".to_string(),
			})?;
		self.chat.send_chat(&self.chat_id, &escape(message)).await
	}
}

fn local_time(timestamp: &str) -> Option<String> {
	DateTime::parse_from_rfc3339(timestamp)
		.ok()
		.map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}
