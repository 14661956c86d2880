// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `dataSignature` validation.

use herald_common_secret::SecretBytes;
use herald_common_webhook::{compute_hmac_sha256_base64, verify_hmac_sha256_base64};

use crate::hybrid::decode;

/// True iff `signature_b64` equals `base64(HMAC-SHA256(key, base64decode(ciphertext_b64)))`.
///
/// Undecodable ciphertext is simply invalid.
pub fn validate(symmetric_key: &SecretBytes, ciphertext_b64: &str, signature_b64: &str) -> bool {
	let Ok(ciphertext) = decode(ciphertext_b64) else {
		return false;
	};
	verify_hmac_sha256_base64(symmetric_key.expose(), &ciphertext, signature_b64.trim())
}

/// Produce the signature [`validate`] expects.
pub fn sign(symmetric_key: &[u8], ciphertext_b64: &str) -> Option<String> {
	decode(ciphertext_b64)
		.ok()
		.map(|ciphertext| compute_hmac_sha256_base64(symmetric_key, &ciphertext))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hybrid::encrypt_bytes;
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	use proptest::prelude::*;

	fn fixture() -> (SecretBytes, String, String) {
		let key = [0x24u8; 32];
		let ciphertext = encrypt_bytes(&key, br#"{"body":{"content":"hi"}}"#).unwrap();
		let signature = sign(&key, &ciphertext).unwrap();
		(SecretBytes::new(key.to_vec()), ciphertext, signature)
	}

	fn flip_bit(b64: &str, bit: usize) -> String {
		let mut raw = STANDARD.decode(b64).unwrap();
		let index = (bit / 8) % raw.len();
		raw[index] ^= 1 << (bit % 8);
		STANDARD.encode(raw)
	}

	#[test]
	fn accepts_matching_signature() {
		let (key, ciphertext, signature) = fixture();
		assert!(validate(&key, &ciphertext, &signature));
	}

	#[test]
	fn rejects_signature_from_another_key() {
		let (_, ciphertext, signature) = fixture();
		let other = SecretBytes::new(vec![0x25u8; 32]);
		assert!(!validate(&other, &ciphertext, &signature));
	}

	#[test]
	fn rejects_undecodable_inputs() {
		let (key, ciphertext, signature) = fixture();
		assert!(!validate(&key, "***", &signature));
		assert!(!validate(&key, &ciphertext, "***"));
		assert!(!validate(&key, &ciphertext, ""));
	}

	proptest! {
		#[test]
		fn prop_any_ciphertext_bit_flip_is_rejected(bit in 0usize..(48 * 8)) {
			let (key, ciphertext, signature) = fixture();
			prop_assert!(!validate(&key, &flip_bit(&ciphertext, bit), &signature));
		}

		#[test]
		fn prop_any_signature_bit_flip_is_rejected(bit in 0usize..(32 * 8)) {
			let (key, ciphertext, signature) = fixture();
			prop_assert!(!validate(&key, &ciphertext, &flip_bit(&signature, bit)));
		}
	}
}
