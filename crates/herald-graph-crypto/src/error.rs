// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for notification decryption.

use thiserror::Error;

/// Errors returned across the crate boundary.
///
/// Every failure after the private key is available collapses into
/// [`CryptoError::CryptoFailure`]. Callers cannot tell a bad base64 field from
/// bad padding or a signature mismatch.
#[derive(Debug, Error)]
pub enum CryptoError {
	/// The private key could not be read or parsed.
	#[error("private key unavailable: {0}")]
	KeyUnavailable(String),

	/// Unwrapping, decrypting, validating or parsing failed.
	#[error("notification could not be decrypted")]
	CryptoFailure,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Where a pipeline step failed. Only ever logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
	Base64,
	Unwrap,
	KeyLength,
	Padding,
	Signature,
	Parse,
}

impl Stage {
	pub(crate) fn fail(self) -> CryptoError {
		tracing::debug!(stage = ?self, "notification crypto step failed");
		CryptoError::CryptoFailure
	}
}
