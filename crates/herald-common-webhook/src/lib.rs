// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC-SHA256 helpers shared by the Graph notification validator and the
//! plugin webhook authenticator.
//!
//! Graph signs the notification ciphertext and sends the digest as standard
//! base64. Integrations sign the raw request body and send the digest as hex,
//! sometimes prefixed with `sha256=`. Every comparison here is constant-time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix some providers put in front of the hex digest.
pub const SHA256_PREFIX: &str = "sha256=";

/// Raw 32-byte HMAC-SHA256 digest.
pub fn hmac_sha256(key: &[u8], payload: &[u8]) -> [u8; 32] {
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
	mac.update(payload);
	let mut digest = [0u8; 32];
	digest.copy_from_slice(&mac.finalize().into_bytes());
	digest
}

/// Hex-encoded digest, no prefix.
pub fn compute_hmac_sha256_hex(key: &[u8], payload: &[u8]) -> String {
	hex::encode(hmac_sha256(key, payload))
}

/// Standard (padded) base64 digest.
pub fn compute_hmac_sha256_base64(key: &[u8], payload: &[u8]) -> String {
	STANDARD.encode(hmac_sha256(key, payload))
}

/// Verify a hex digest. An optional `sha256=` prefix is accepted; malformed hex
/// is a mismatch.
pub fn verify_hmac_sha256_hex(key: &[u8], payload: &[u8], signature: &str) -> bool {
	let signature = signature.trim();
	let signature = signature.strip_prefix(SHA256_PREFIX).unwrap_or(signature);

	let Ok(expected) = hex::decode(signature) else {
		return false;
	};

	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
	mac.update(payload);
	mac.verify_slice(&expected).is_ok()
}

/// Verify a base64 digest by comparing its encoded form.
///
/// The comparison is on the encoded strings, so a signature that decodes to the
/// right bytes but is spelled differently (missing padding, for instance) is
/// rejected.
pub fn verify_hmac_sha256_base64(key: &[u8], payload: &[u8], signature: &str) -> bool {
	let expected = compute_hmac_sha256_base64(key, payload);
	constant_time_str_eq(&expected, signature)
}

/// Compare two strings without short-circuiting on the first differing byte.
///
/// Length is not secret: strings of different length return early.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
	a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_digest_is_64_chars() {
		let sig = compute_hmac_sha256_hex(b"plugin-secret", b"{\"event\":\"up\"}");
		assert_eq!(sig.len(), 64);
		assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn known_vector() {
		// RFC 4231 test case 2.
		let sig = compute_hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?");
		assert_eq!(
			sig,
			"5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
		);
	}

	#[test]
	fn hex_verification_accepts_prefix_and_whitespace() {
		let sig = compute_hmac_sha256_hex(b"k", b"body");
		assert!(verify_hmac_sha256_hex(b"k", b"body", &sig));
		assert!(verify_hmac_sha256_hex(b"k", b"body", &format!("sha256={sig}")));
		assert!(verify_hmac_sha256_hex(b"k", b"body", &format!(" {sig}\n")));
	}

	#[test]
	fn hex_verification_rejects_garbage() {
		assert!(!verify_hmac_sha256_hex(b"k", b"body", "not-hex"));
		assert!(!verify_hmac_sha256_hex(b"k", b"body", ""));
		assert!(!verify_hmac_sha256_hex(b"k", b"body", &"0".repeat(64)));
	}

	#[test]
	fn base64_verification() {
		let key = [7u8; 32];
		let sig = compute_hmac_sha256_base64(&key, b"ciphertext");
		assert!(sig.ends_with('='));
		assert!(verify_hmac_sha256_base64(&key, b"ciphertext", &sig));
		assert!(!verify_hmac_sha256_base64(&key, b"ciphertexT", &sig));
		assert!(!verify_hmac_sha256_base64(&key, b"ciphertext", sig.trim_end_matches('=')));
	}

	#[test]
	fn str_eq() {
		assert!(constant_time_str_eq("token", "token"));
		assert!(!constant_time_str_eq("token", "tokem"));
		assert!(!constant_time_str_eq("token", "token2"));
		assert!(constant_time_str_eq("", ""));
	}
}
