// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph request and response bodies.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// An active change-notification subscription as Graph reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
	pub id: String,
	pub resource: String,
	pub expiration_date_time: DateTime<Utc>,
	#[serde(default)]
	pub change_type: Option<String>,
	#[serde(default)]
	pub notification_url: Option<String>,
}

impl Subscription {
	/// Whether this subscription covers `resource`. Graph may echo the resource
	/// without its leading slash.
	pub fn covers(&self, resource: &str) -> bool {
		self.resource.trim_start_matches('/') == resource.trim_start_matches('/')
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionPage {
	pub value: Vec<Subscription>,
	#[serde(rename = "@odata.nextLink", default)]
	pub next_link: Option<String>,
}

/// Body of `POST /subscriptions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
	pub resource: String,
	pub notification_url: String,
	pub change_type: String,
	pub expiration_date_time: String,
	/// Base64 DER of the certificate Graph encrypts resource data to.
	pub encryption_certificate: String,
	pub encryption_certificate_id: String,
	pub include_resource_data: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenewSubscription<'a> {
	pub expiration_date_time: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessageRequest<'a> {
	pub body: ItemBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemBody<'a> {
	pub content_type: &'a str,
	pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
	pub id: String,
}

/// Expiration timestamp `lifetime` from now, in the ISO-8601 UTC form Graph
/// accepts.
pub fn expiration_from_now(lifetime: Duration) -> String {
	expiration_from(Utc::now(), lifetime)
}

pub fn expiration_from(now: DateTime<Utc>, lifetime: Duration) -> String {
	let lifetime = chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::hours(1));
	(now + lifetime).to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_parse_graph_subscription() {
		let json = r#"{
			"id": "7f105c7d-2dc5-4530-97cd-4e7ae6534c07",
			"resource": "/chats/19:abc/messages",
			"changeType": "created",
			"notificationUrl": "https://bot.example.com/chat",
			"expirationDateTime": "2025-03-01T12:00:00.0000000Z",
			"includeResourceData": true
		}"#;
		let sub: Subscription = serde_json::from_str(json).unwrap();
		assert_eq!(sub.id, "7f105c7d-2dc5-4530-97cd-4e7ae6534c07");
		assert_eq!(sub.change_type.as_deref(), Some("created"));
		assert_eq!(
			sub.expiration_date_time,
			Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
		);
	}

	#[test]
	fn test_covers_ignores_leading_slash() {
		let sub = Subscription {
			id: "1".into(),
			resource: "chats/19:abc/messages".into(),
			expiration_date_time: Utc::now(),
			change_type: None,
			notification_url: None,
		};
		assert!(sub.covers("/chats/19:abc/messages"));
		assert!(!sub.covers("/chats/19:other/messages"));
	}

	#[test]
	fn test_new_subscription_uses_graph_field_names() {
		let body = NewSubscription {
			resource: "/chats/19:abc/messages".into(),
			notification_url: "https://bot.example.com/chat".into(),
			change_type: "created".into(),
			expiration_date_time: "2025-03-01T12:00:00.000000Z".into(),
			encryption_certificate: "MIIB".into(),
			encryption_certificate_id: "herald".into(),
			include_resource_data: true,
		};
		let value = serde_json::to_value(&body).unwrap();
		assert_eq!(value["notificationUrl"], "https://bot.example.com/chat");
		assert_eq!(value["encryptionCertificateId"], "herald");
		assert_eq!(value["includeResourceData"], true);
		assert_eq!(value["changeType"], "created");
	}

	#[test]
	fn test_expiration_is_one_lifetime_out() {
		let now = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
		assert_eq!(
			expiration_from(now, Duration::from_secs(3600)),
			"2025-03-01T12:00:00.000000Z"
		);
	}
}
