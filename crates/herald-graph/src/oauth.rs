// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization-code flow against the Microsoft identity platform.

use async_trait::async_trait;
use chrono::Utc;
use herald_common_secret::SecretString;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{GraphError, Result};
use crate::token::BearerToken;

pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

/// Delegated permissions the bot needs to read and post chat messages.
/// `offline_access` makes the login endpoint issue a refresh token.
pub const SCOPES: &[&str] = &[
	"ChatMessage.Send",
	"Chat.ReadWrite",
	"Chat.ReadBasic",
	"Chat.Read",
	"offline_access",
];

/// App registration details.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
	pub login_url: String,
	pub tenant: String,
	pub client_id: String,
	pub client_secret: SecretString,
	/// Where the login endpoint sends the user back with `?code=`.
	pub redirect_url: String,
	/// Account to pre-fill on the consent page.
	pub login_hint: Option<String>,
}

/// The login endpoint, abstracted so the lifecycle manager can be driven
/// without the network.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
	/// The consent URL a user opens to authorize the app.
	fn authorization_url(&self) -> Result<Url>;

	async fn redeem_code(&self, code: &str) -> Result<BearerToken>;

	async fn refresh(&self, refresh_token: &SecretString) -> Result<BearerToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
	http: Client,
	config: OAuthConfig,
}

impl OAuthClient {
	pub fn new(config: OAuthConfig) -> Result<Self> {
		Ok(Self::with_http(crate::http::new_client()?, config))
	}

	pub fn with_http(http: Client, config: OAuthConfig) -> Self {
		Self { http, config }
	}

	fn tenant_endpoint(&self, leaf: &str) -> Result<Url> {
		let base = self.config.login_url.trim_end_matches('/');
		Ok(Url::parse(&format!(
			"{base}/{}/oauth2/v2.0/{leaf}",
			self.config.tenant
		))?)
	}

	fn scope() -> String {
		SCOPES.join(" ")
	}

	async fn request_token(
		&self,
		grant: &[(&str, &str)],
		previous_refresh: Option<&SecretString>,
	) -> Result<BearerToken> {
		let scope = Self::scope();
		let mut form: Vec<(&str, &str)> = vec![
			("client_id", self.config.client_id.as_str()),
			("client_secret", self.config.client_secret.expose().as_str()),
			("scope", scope.as_str()),
		];
		form.extend_from_slice(grant);

		let response = self
			.http
			.post(self.tenant_endpoint("token")?)
			.form(&form)
			.send()
			.await?;

		let status = response.status();
		if status.is_success() {
			let token: TokenResponse = response
				.json()
				.await
				.map_err(|e| GraphError::invalid_response(e.to_string()))?;

			let refresh_token = match (token.refresh_token, previous_refresh) {
				(Some(fresh), _) => SecretString::new(fresh),
				(None, Some(previous)) => previous.clone(),
				(None, None) => {
					return Err(GraphError::invalid_response(
						"token response carried no refresh_token",
					))
				}
			};

			Ok(BearerToken {
				access_token: SecretString::new(token.access_token),
				refresh_token,
				expires_in: token.expires_in,
				acquired_at: Utc::now(),
			})
		} else {
			let body = response.text().await.unwrap_or_default();
			let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
				Ok(err) => err.error_description.unwrap_or(err.error),
				Err(_) => format!("HTTP {status}: {body}"),
			};
			error!(status = %status, error = %message, "Token request rejected");
			Err(GraphError::TokenRejected(message))
		}
	}
}

#[async_trait]
impl TokenEndpoint for OAuthClient {
	fn authorization_url(&self) -> Result<Url> {
		let mut url = self.tenant_endpoint("authorize")?;
		{
			let mut params = url.query_pairs_mut();
			params.append_pair("client_id", &self.config.client_id);
			params.append_pair("response_type", "code");
			params.append_pair("redirect_uri", &self.config.redirect_url);
			params.append_pair("response_mode", "query");
			params.append_pair("scope", &Self::scope());
			if let Some(hint) = &self.config.login_hint {
				params.append_pair("login_hint", hint);
			}
		}
		Ok(url)
	}

	async fn redeem_code(&self, code: &str) -> Result<BearerToken> {
		debug!("Exchanging authorization code for tokens");
		let token = self
			.request_token(
				&[
					("grant_type", "authorization_code"),
					("code", code),
					("redirect_uri", self.config.redirect_url.as_str()),
				],
				None,
			)
			.await?;
		info!(expires_in = token.expires_in, "Exchanged authorization code for tokens");
		Ok(token)
	}

	async fn refresh(&self, refresh_token: &SecretString) -> Result<BearerToken> {
		debug!("Refreshing access token");
		let token = self
			.request_token(
				&[
					("grant_type", "refresh_token"),
					("refresh_token", refresh_token.expose().as_str()),
				],
				Some(refresh_token),
			)
			.await?;
		info!(expires_in = token.expires_in, "Refreshed access token");
		Ok(token)
	}
}
