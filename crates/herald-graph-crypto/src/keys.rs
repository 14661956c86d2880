// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The instance's RSA key pair and public certificate.

use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{CryptoError, Result};

/// Private key used to unwrap per-notification symmetric keys.
///
/// Loaded once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct KeyPair {
	private: RsaPrivateKey,
	modulus_len: usize,
}

impl KeyPair {
	/// Parse a PEM private key in PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
	/// (`BEGIN RSA PRIVATE KEY`) form.
	pub fn from_pem(pem: &str) -> Result<Self> {
		let private = RsaPrivateKey::from_pkcs8_pem(pem)
			.or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
			.map_err(|e| CryptoError::KeyUnavailable(format!("invalid RSA private key: {e}")))?;
		Ok(Self::from_private_key(private))
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let pem = std::fs::read_to_string(path)
			.map_err(|e| CryptoError::KeyUnavailable(format!("{}: {e}", path.display())))?;
		Self::from_pem(&pem)
	}

	pub fn from_private_key(private: RsaPrivateKey) -> Self {
		let modulus_len = private.size();
		Self {
			private,
			modulus_len,
		}
	}

	/// Modulus length in bytes; also the size of one OAEP ciphertext block.
	pub fn modulus_len(&self) -> usize {
		self.modulus_len
	}

	pub fn public_key(&self) -> RsaPublicKey {
		self.private.to_public_key()
	}

	pub(crate) fn private_key(&self) -> &RsaPrivateKey {
		&self.private
	}
}

impl std::fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyPair")
			.field("modulus_len", &self.modulus_len)
			.finish_non_exhaustive()
	}
}

/// Base64 body of a PEM certificate with the armour lines and line breaks
/// removed, as Graph expects in `encryptionCertificate`.
pub fn certificate_body(pem: &str) -> String {
	pem.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with("-----"))
		.collect()
}
