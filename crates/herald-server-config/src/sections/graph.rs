// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph API and app registration section.

use herald_common_secret::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::sections::HttpConfig;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";
pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_ENCRYPTION_CERTIFICATE_ID: &str = "herald";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub login_url: Option<String>,
	#[serde(default)]
	pub tenant: Option<String>,
	#[serde(default)]
	pub client_id: Option<String>,
	#[serde(default)]
	pub client_secret: Option<SecretString>,
	#[serde(default)]
	pub redirect_url: Option<String>,
	#[serde(default)]
	pub login_hint: Option<String>,
	#[serde(default)]
	pub notification_url: Option<String>,
	#[serde(default)]
	pub encryption_certificate_id: Option<String>,
	#[serde(default)]
	pub admin_chat_id: Option<String>,
}

impl GraphConfigLayer {
	pub fn merge(&mut self, other: GraphConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.login_url.is_some() {
			self.login_url = other.login_url;
		}
		if other.tenant.is_some() {
			self.tenant = other.tenant;
		}
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
		if other.redirect_url.is_some() {
			self.redirect_url = other.redirect_url;
		}
		if other.login_hint.is_some() {
			self.login_hint = other.login_hint;
		}
		if other.notification_url.is_some() {
			self.notification_url = other.notification_url;
		}
		if other.encryption_certificate_id.is_some() {
			self.encryption_certificate_id = other.encryption_certificate_id;
		}
		if other.admin_chat_id.is_some() {
			self.admin_chat_id = other.admin_chat_id;
		}
	}

	/// Resolve against the HTTP section, which supplies the default callback
	/// and notification URLs.
	pub fn finalize(self, http: &HttpConfig) -> Result<GraphConfig, ConfigError> {
		let tenant = required(self.tenant, "graph.tenant")?;
		let client_id = required(self.client_id, "graph.client_id")?;
		let client_secret = self
			.client_secret
			.filter(|s| !s.is_empty())
			.ok_or_else(|| {
				ConfigError::validation(
					"graph.client_secret is required (set HERALD_SERVER_GRAPH_CLIENT_SECRET or _FILE)",
				)
			})?;

		Ok(GraphConfig {
			base_url: self
				.base_url
				.unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
			login_url: self.login_url.unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
			tenant,
			client_id,
			client_secret,
			redirect_url: self
				.redirect_url
				.unwrap_or_else(|| format!("{}/callback", http.base_url)),
			login_hint: self.login_hint.filter(|s| !s.is_empty()),
			notification_url: self
				.notification_url
				.unwrap_or_else(|| format!("{}/chat", http.base_url)),
			encryption_certificate_id: self
				.encryption_certificate_id
				.unwrap_or_else(|| DEFAULT_ENCRYPTION_CERTIFICATE_ID.to_string()),
			admin_chat_id: self.admin_chat_id.filter(|s| !s.is_empty()),
		})
	}
}

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ConfigError::validation(format!("{key} is required")))
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
	pub base_url: String,
	pub login_url: String,
	pub tenant: String,
	pub client_id: String,
	pub client_secret: SecretString,
	pub redirect_url: String,
	pub login_hint: Option<String>,
	pub notification_url: String,
	pub encryption_certificate_id: String,
	/// Chat that receives operator alerts. Alerts are only logged when unset.
	pub admin_chat_id: Option<String>,
}
