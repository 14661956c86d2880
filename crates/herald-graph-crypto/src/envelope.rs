// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Change-notification wire types and the open pipeline.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, Stage};
use crate::hybrid::{decrypt_payload, unwrap_key};
use crate::keys::KeyPair;
use crate::signature::validate;

/// Body of a notification POST: `{"value": [...]}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChangeNotificationCollection {
	#[serde(default)]
	pub value: Vec<ChangeNotification>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
	#[serde(default)]
	pub subscription_id: Option<String>,
	#[serde(default)]
	pub resource: Option<String>,
	#[serde(default)]
	pub change_type: Option<String>,
	#[serde(default)]
	pub encrypted_content: Option<EncryptedEnvelope>,
}

/// `encryptedContent` of a rich notification.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
	/// RSA-OAEP wrapped symmetric key, base64.
	pub data_key: String,
	/// HMAC-SHA256 of the decoded `data`, base64.
	pub data_signature: String,
	/// AES-CBC ciphertext, base64.
	pub data: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub encryption_certificate_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub encryption_certificate_thumbprint: Option<String>,
}

impl std::fmt::Debug for EncryptedEnvelope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EncryptedEnvelope")
			.field("data_len", &self.data.len())
			.field("encryption_certificate_id", &self.encryption_certificate_id)
			.finish_non_exhaustive()
	}
}

/// Unwrap the key, check the signature, and only then decrypt and parse.
///
/// Nothing is decrypted when the signature does not match, so the caller can
/// never act on unauthenticated content.
pub fn open<T: DeserializeOwned>(key_pair: &KeyPair, envelope: &EncryptedEnvelope) -> Result<T> {
	let key = unwrap_key(&envelope.data_key, key_pair)?;

	if !validate(&key, &envelope.data, &envelope.data_signature) {
		return Err(Stage::Signature.fail());
	}

	decrypt_payload(&key, &envelope.data)
}

/// Build an envelope for `payload` the way Graph does: random 32-byte key,
/// wrapped for `public_key`, signed over the ciphertext.
pub fn seal(
	public_key: &rsa::RsaPublicKey,
	payload: &[u8],
	certificate_id: Option<&str>,
) -> Result<EncryptedEnvelope> {
	use rand::RngCore;
	use zeroize::Zeroizing;

	let mut key = Zeroizing::new([0u8; 32]);
	rand::thread_rng().fill_bytes(key.as_mut());

	let data = crate::hybrid::encrypt_bytes(key.as_ref(), payload)?;
	let data_signature =
		crate::signature::sign(key.as_ref(), &data).ok_or_else(|| Stage::Base64.fail())?;
	let data_key = crate::hybrid::wrap_key(public_key, key.as_ref())?;

	Ok(EncryptedEnvelope {
		data_key,
		data_signature,
		data,
		encryption_certificate_id: certificate_id.map(str::to_string),
		encryption_certificate_thumbprint: None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::CryptoError;
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;

	const TEST_KEY: &str = include_str!("../testdata/graph_test_key.pem");
	const ALICE: &str = r#"{"from":{"user":{"displayName":"Alice"}},"body":{"content":"hi"},"chatId":"19:abc"}"#;

	fn pair() -> KeyPair {
		KeyPair::from_pem(TEST_KEY).unwrap()
	}

	#[test]
	fn opens_a_valid_envelope() {
		let pair = pair();
		let envelope = seal(&pair.public_key(), ALICE.as_bytes(), Some("herald")).unwrap();

		let payload: serde_json::Value = open(&pair, &envelope).unwrap();
		assert_eq!(payload["from"]["user"]["displayName"], "Alice");
		assert_eq!(payload["body"]["content"], "hi");
		assert_eq!(payload["chatId"], "19:abc");
	}

	#[test]
	fn one_corrupted_signature_byte_rejects_the_envelope() {
		let pair = pair();
		let mut envelope = seal(&pair.public_key(), ALICE.as_bytes(), None).unwrap();

		let mut sig = STANDARD.decode(&envelope.data_signature).unwrap();
		sig[0] ^= 0x01;
		envelope.data_signature = STANDARD.encode(sig);

		let result: Result<serde_json::Value> = open(&pair, &envelope);
		assert!(matches!(result, Err(CryptoError::CryptoFailure)));
	}

	#[test]
	fn ciphertext_swapped_from_another_envelope_is_rejected() {
		let pair = pair();
		let mut first = seal(&pair.public_key(), ALICE.as_bytes(), None).unwrap();
		let second = seal(&pair.public_key(), br#"{"chatId":"19:evil"}"#, None).unwrap();
		first.data = second.data;

		let result: Result<serde_json::Value> = open(&pair, &first);
		assert!(result.is_err());
	}

	#[test]
	fn parses_graph_notification_collection() {
		let pair = pair();
		let envelope = seal(&pair.public_key(), ALICE.as_bytes(), Some("herald")).unwrap();
		let body = serde_json::json!({
			"value": [{
				"subscriptionId": "sub-1",
				"resource": "chats('19:abc')/messages('1')",
				"changeType": "created",
				"encryptedContent": envelope,
			}]
		});

		let collection: ChangeNotificationCollection = serde_json::from_value(body).unwrap();
		let first = &collection.value[0];
		assert_eq!(first.subscription_id.as_deref(), Some("sub-1"));
		let content = first.encrypted_content.as_ref().unwrap();
		assert_eq!(content.encryption_certificate_id.as_deref(), Some("herald"));

		let payload: serde_json::Value = open(&pair, content).unwrap();
		assert_eq!(payload["chatId"], "19:abc");
	}

	#[test]
	fn envelope_debug_hides_fields() {
		let pair = pair();
		let envelope = seal(&pair.public_key(), ALICE.as_bytes(), None).unwrap();
		let debug = format!("{envelope:?}");
		assert!(!debug.contains(&envelope.data_key));
		assert!(!debug.contains(&envelope.data));
	}
}
