// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
	/// The secrets store could not be read from disk.
	#[error("failed to read secrets store at {path}: {source}")]
	StoreUnreadable {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The secrets store is not valid TOML or has the wrong shape.
	#[error("invalid secrets store: {0}")]
	StoreInvalid(String),

	/// No group for the device type, or no record in it matches the name.
	#[error("no credentials for {device_type} device {name}")]
	NotFound { device_type: String, name: String },

	/// Wrong passphrase, tampered record or malformed token.
	#[error("credential could not be decrypted")]
	DecryptFailed,

	/// The master passphrase was not provided.
	#[error("master passphrase not set: {0}")]
	MissingPassphrase(String),

	/// Sealing a new record failed.
	#[error("failed to seal credential: {0}")]
	Seal(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
