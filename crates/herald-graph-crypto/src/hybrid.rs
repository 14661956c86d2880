// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hybrid decryption: RSA-OAEP unwraps the per-notification key, AES-CBC
//! decrypts the resource data with that key.
//!
//! OAEP uses SHA-1 for both the label hash and MGF1, which is what Graph's
//! `dataKey` is produced with. The AES IV is the first 16 bytes of the key.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use herald_common_secret::SecretBytes;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use serde::de::DeserializeOwned;
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result, Stage};
use crate::keys::KeyPair;

/// AES block size; also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// OAEP overhead with a SHA-1 digest: two hashes plus two marker bytes.
const OAEP_SHA1_OVERHEAD: usize = 2 * 20 + 2;

/// Recover the symmetric key from a base64 `dataKey`.
///
/// An input no longer than one modulus is a single OAEP block. Anything longer
/// is cut into modulus-sized chunks (the last may be short), each decrypted
/// independently and concatenated in order.
pub fn unwrap_key(encrypted_b64: &str, key_pair: &KeyPair) -> Result<SecretBytes> {
	let wrapped = decode(encrypted_b64)?;
	let block = key_pair.modulus_len();

	if wrapped.len() <= block {
		let plain = oaep_decrypt(key_pair, &wrapped)?;
		return Ok(SecretBytes::new(plain.to_vec()));
	}

	let mut key = Vec::with_capacity(wrapped.len());
	for chunk in wrapped.chunks(block) {
		let plain = oaep_decrypt(key_pair, chunk)?;
		key.extend_from_slice(&plain);
	}
	Ok(SecretBytes::new(key))
}

fn oaep_decrypt(key_pair: &KeyPair, chunk: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
	key_pair
		.private_key()
		.decrypt(Oaep::new::<Sha1>(), chunk)
		.map(Zeroizing::new)
		.map_err(|_| Stage::Unwrap.fail())
}

/// Decrypt base64 AES-CBC ciphertext and strip PKCS#7 padding.
///
/// The key selects AES-128, -192 or -256 by its length.
pub fn decrypt_bytes(key: &SecretBytes, ciphertext_b64: &str) -> Result<Zeroizing<Vec<u8>>> {
	let ciphertext = decode(ciphertext_b64)?;
	let key = key.expose();
	let iv = iv_of(key)?;

	let plain = match key.len() {
		16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
		24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
		32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
		_ => return Err(Stage::KeyLength.fail()),
	};

	plain.map(Zeroizing::new).map_err(|_| Stage::Padding.fail())
}

/// [`decrypt_bytes`] followed by JSON parsing into `T`.
pub fn decrypt_payload<T: DeserializeOwned>(key: &SecretBytes, ciphertext_b64: &str) -> Result<T> {
	let plain = decrypt_bytes(key, ciphertext_b64)?;
	serde_json::from_slice(&plain).map_err(|_| Stage::Parse.fail())
}

/// Wrap `key` for `public_key` in OAEP-SHA1 blocks.
///
/// Keys longer than one block's capacity are split, producing one
/// modulus-sized ciphertext per piece. This is the inverse of [`unwrap_key`].
pub fn wrap_key(public_key: &RsaPublicKey, key: &[u8]) -> Result<String> {
	let capacity = public_key.size().saturating_sub(OAEP_SHA1_OVERHEAD);
	if capacity == 0 {
		return Err(CryptoError::KeyUnavailable("modulus too small for OAEP".into()));
	}

	let mut rng = rand::thread_rng();
	let mut wrapped = Vec::new();
	let pieces: Vec<&[u8]> = if key.is_empty() {
		vec![key]
	} else {
		key.chunks(capacity).collect()
	};
	for piece in pieces {
		let block = public_key
			.encrypt(&mut rng, Oaep::new::<Sha1>(), piece)
			.map_err(|_| CryptoError::CryptoFailure)?;
		wrapped.extend_from_slice(&block);
	}
	Ok(STANDARD.encode(wrapped))
}

/// AES-CBC encrypt with the key-derived IV and return base64. Inverse of
/// [`decrypt_bytes`].
pub fn encrypt_bytes(key: &[u8], plaintext: &[u8]) -> Result<String> {
	let iv = iv_of(key)?;
	let ciphertext = match key.len() {
		16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.encrypt_padded_vec_mut::<Pkcs7>(plaintext),
		24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.encrypt_padded_vec_mut::<Pkcs7>(plaintext),
		32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
			.map_err(|_| Stage::KeyLength.fail())?
			.encrypt_padded_vec_mut::<Pkcs7>(plaintext),
		_ => return Err(Stage::KeyLength.fail()),
	};
	Ok(STANDARD.encode(ciphertext))
}

fn iv_of(key: &[u8]) -> Result<&[u8]> {
	key.get(..BLOCK_SIZE).ok_or_else(|| Stage::KeyLength.fail())
}

pub(crate) fn decode(value: &str) -> Result<Vec<u8>> {
	STANDARD.decode(value.trim()).map_err(|_| Stage::Base64.fail())
}
