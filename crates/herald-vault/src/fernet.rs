// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Passphrase key derivation and Fernet tokens.
//!
//! A token is URL-safe base64 of
//! `0x80 | timestamp (u64 BE) | iv (16) | AES-128-CBC ciphertext | HMAC-SHA256 (32)`.
//! The 32-byte derived key is split: the first half signs, the second half
//! encrypts. The HMAC covers everything before it and is checked before any
//! decryption is attempted.

use std::time::{SystemTime, UNIX_EPOCH};

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use herald_common_webhook::hmac_sha256;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

const VERSION: u8 = 0x80;
const HEADER_LEN: usize = 1 + 8 + 16;
const MAC_LEN: usize = 32;

/// URL-safe alphabet, padding written on encode and optional on decode.
pub(crate) const URL_SAFE_B64: GeneralPurpose = GeneralPurpose::new(
	&URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// PBKDF2-HMAC-SHA256, 100 000 rounds, 32 bytes.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
	let mut key = Zeroizing::new([0u8; KEY_LEN]);
	pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ITERATIONS, key.as_mut());
	key
}

pub fn generate_salt() -> [u8; SALT_LEN] {
	let mut salt = [0u8; SALT_LEN];
	rand::thread_rng().fill_bytes(&mut salt);
	salt
}

/// Decrypt a token. Any defect is [`VaultError::DecryptFailed`].
pub fn decrypt(key: &[u8; KEY_LEN], token: &str) -> Result<Zeroizing<Vec<u8>>> {
	let raw = URL_SAFE_B64
		.decode(token.trim())
		.map_err(|_| VaultError::DecryptFailed)?;

	if raw.len() < HEADER_LEN + MAC_LEN || raw[0] != VERSION {
		return Err(VaultError::DecryptFailed);
	}

	let (signed, mac) = raw.split_at(raw.len() - MAC_LEN);
	let expected = hmac_sha256(&key[..16], signed);
	if !bool::from(expected.as_slice().ct_eq(mac)) {
		return Err(VaultError::DecryptFailed);
	}

	let iv = &signed[9..HEADER_LEN];
	let ciphertext = &signed[HEADER_LEN..];
	cbc::Decryptor::<aes::Aes128>::new_from_slices(&key[16..], iv)
		.map_err(|_| VaultError::DecryptFailed)?
		.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
		.map(Zeroizing::new)
		.map_err(|_| VaultError::DecryptFailed)
}

/// Produce a token for `plaintext` with a fresh IV and the current time.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
	let mut iv = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut iv);
	let timestamp = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_err(|e| VaultError::Seal(e.to_string()))?
		.as_secs();

	let ciphertext = cbc::Encryptor::<aes::Aes128>::new_from_slices(&key[16..], &iv)
		.map_err(|e| VaultError::Seal(e.to_string()))?
		.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

	let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
	token.push(VERSION);
	token.extend_from_slice(&timestamp.to_be_bytes());
	token.extend_from_slice(&iv);
	token.extend_from_slice(&ciphertext);
	let mac = hmac_sha256(&key[..16], &token);
	token.extend_from_slice(&mac);

	Ok(URL_SAFE_B64.encode(token))
}
