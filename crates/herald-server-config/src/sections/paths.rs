// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material and state file locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_private_key() -> PathBuf {
	PathBuf::from("private.pem")
}

fn default_public_certificate() -> PathBuf {
	PathBuf::from("public.pem")
}

fn default_token_file() -> PathBuf {
	PathBuf::from("token.json")
}

fn default_secrets_file() -> PathBuf {
	PathBuf::from("secrets.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathsConfigLayer {
	pub private_key: Option<PathBuf>,
	pub public_certificate: Option<PathBuf>,
	pub token_file: Option<PathBuf>,
	pub secrets_file: Option<PathBuf>,
}

impl PathsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.private_key.is_some() {
			self.private_key = other.private_key;
		}
		if other.public_certificate.is_some() {
			self.public_certificate = other.public_certificate;
		}
		if other.token_file.is_some() {
			self.token_file = other.token_file;
		}
		if other.secrets_file.is_some() {
			self.secrets_file = other.secrets_file;
		}
	}

	pub fn finalize(self) -> PathsConfig {
		PathsConfig {
			private_key: self.private_key.unwrap_or_else(default_private_key),
			public_certificate: self
				.public_certificate
				.unwrap_or_else(default_public_certificate),
			token_file: self.token_file.unwrap_or_else(default_token_file),
			secrets_file: self.secrets_file.unwrap_or_else(default_secrets_file),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
	/// PEM private key that unwraps notification keys.
	pub private_key: PathBuf,
	/// PEM certificate sent to Graph with each new subscription.
	pub public_certificate: PathBuf,
	pub token_file: PathBuf,
	pub secrets_file: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		PathsConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = PathsConfig::default();
		assert_eq!(config.private_key, PathBuf::from("private.pem"));
		assert_eq!(config.public_certificate, PathBuf::from("public.pem"));
		assert_eq!(config.token_file, PathBuf::from("token.json"));
		assert_eq!(config.secrets_file, PathBuf::from("secrets.toml"));
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = PathsConfigLayer {
			token_file: Some(PathBuf::from("/var/lib/herald/token.json")),
			..Default::default()
		};
		base.merge(PathsConfigLayer {
			private_key: Some(PathBuf::from("/etc/herald/key.pem")),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.token_file, PathBuf::from("/var/lib/herald/token.json"));
		assert_eq!(config.private_key, PathBuf::from("/etc/herald/key.pem"));
	}
}
