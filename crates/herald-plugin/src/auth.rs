// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound webhook authentication.
//!
//! Integrations either sign the raw body with a shared secret (HMAC mode) or,
//! for providers that cannot sign, send a static secret in a header
//! (plain-header mode). The second mode is weaker and is named as such
//! wherever it appears.

use herald_common_secret::SecretString;
use herald_common_webhook::{constant_time_str_eq, verify_hmac_sha256_hex};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result of checking one webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
	Authenticated,
	SignatureMismatch,
	HeaderMissing,
}

impl AuthOutcome {
	pub fn is_authenticated(self) -> bool {
		matches!(self, AuthOutcome::Authenticated)
	}
}

/// Configured authentication mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
	#[default]
	Hmac,
	/// Static secret compared against a header value. Proves only that the
	/// sender knows the secret, not that the body is unmodified.
	PlainHeaderWeak,
}

/// How a plugin's webhooks are authenticated.
#[derive(Debug, Clone)]
pub enum AuthPolicy {
	/// Hex HMAC-SHA256 of the raw body in `header`, optionally `sha256=` prefixed.
	Hmac { header: String, secret: SecretString },
	/// `header` must equal `secret` exactly.
	PlainHeaderWeak { header: String, secret: SecretString },
}

impl AuthPolicy {
	pub fn new(mode: AuthMode, header: impl Into<String>, secret: SecretString) -> Self {
		let header = header.into();
		match mode {
			AuthMode::Hmac => AuthPolicy::Hmac { header, secret },
			AuthMode::PlainHeaderWeak => AuthPolicy::PlainHeaderWeak { header, secret },
		}
	}

	pub fn header(&self) -> &str {
		match self {
			AuthPolicy::Hmac { header, .. } | AuthPolicy::PlainHeaderWeak { header, .. } => header,
		}
	}

	pub fn mode(&self) -> AuthMode {
		match self {
			AuthPolicy::Hmac { .. } => AuthMode::Hmac,
			AuthPolicy::PlainHeaderWeak { .. } => AuthMode::PlainHeaderWeak,
		}
	}

	pub fn is_weak(&self) -> bool {
		self.mode() == AuthMode::PlainHeaderWeak
	}

	pub fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> AuthOutcome {
		match self {
			AuthPolicy::Hmac { header, secret } => authenticate(headers, body, header, secret),
			AuthPolicy::PlainHeaderWeak { header, secret } => {
				authenticate_plain_header(headers, header, secret)
			}
		}
	}
}

/// HMAC-SHA256 check of `body` against the hex digest in `header_name`.
pub fn authenticate(
	headers: &HeaderMap,
	body: &[u8],
	header_name: &str,
	shared_secret: &SecretString,
) -> AuthOutcome {
	let Some(value) = header_value(headers, header_name) else {
		warn!(header = header_name, "webhook signature header missing");
		return AuthOutcome::HeaderMissing;
	};

	if !shared_secret.is_empty() && verify_hmac_sha256_hex(shared_secret.as_bytes(), body, value) {
		debug!(header = header_name, "webhook signature verified");
		AuthOutcome::Authenticated
	} else {
		warn!(header = header_name, "webhook signature mismatch");
		AuthOutcome::SignatureMismatch
	}
}

/// Weak mode: constant-time equality of the header value and the secret.
pub fn authenticate_plain_header(
	headers: &HeaderMap,
	header_name: &str,
	secret: &SecretString,
) -> AuthOutcome {
	let Some(value) = header_value(headers, header_name) else {
		warn!(header = header_name, "webhook secret header missing");
		return AuthOutcome::HeaderMissing;
	};

	if !secret.is_empty() && constant_time_str_eq(value.trim(), secret.expose()) {
		debug!(header = header_name, mode = "plain_header_weak", "webhook secret matched");
		AuthOutcome::Authenticated
	} else {
		warn!(header = header_name, mode = "plain_header_weak", "webhook secret mismatch");
		AuthOutcome::SignatureMismatch
	}
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name).and_then(|v| v.to_str().ok())
}
