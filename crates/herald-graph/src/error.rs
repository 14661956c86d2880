// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

/// Errors from calls to Graph and the login endpoint.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	/// Transport failure: connection refused, timeout, TLS.
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// Graph answered with a non-success status.
	#[error("Graph API error ({status}): {message}")]
	Api { status: u16, message: String },

	/// The response body did not have the expected shape.
	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("invalid URL: {0}")]
	Url(#[from] url::ParseError),

	/// The login endpoint refused an authorization code or refresh token.
	#[error("token request rejected: {0}")]
	TokenRejected(String),

	/// Reading or writing the persisted bearer token failed.
	#[error("token store error: {0}")]
	TokenStore(String),

	/// No bearer token has been acquired yet.
	#[error("not authenticated with Graph")]
	NotAuthenticated,
}

impl GraphError {
	pub fn invalid_response(message: impl Into<String>) -> Self {
		Self::InvalidResponse(message.into())
	}

	pub fn token_store(message: impl ToString) -> Self {
		Self::TokenStore(message.to_string())
	}
}

/// Errors from the credential lifecycle state machine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
	#[error(transparent)]
	Graph(#[from] GraphError),

	#[error("authorization code is missing")]
	MissingCode,

	/// The refresh was attempted and failed. Recovery needs a new
	/// authorization.
	#[error("token refresh failed: {0}")]
	RefreshFailed(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Graph's error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
	pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub message: Option<String>,
}

/// Build a [`GraphError::Api`] from a failed response, preferring Graph's own
/// error message over the raw body.
pub(crate) async fn api_error(response: reqwest::Response) -> GraphError {
	let status = response.status().as_u16();
	let body = response.text().await.unwrap_or_default();
	let message = match serde_json::from_str::<ApiErrorBody>(&body) {
		Ok(parsed) => parsed
			.error
			.message
			.or(parsed.error.code)
			.unwrap_or_else(|| body.clone()),
		Err(_) => body,
	};
	GraphError::Api { status, message }
}
