// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decryption of Microsoft Graph rich change notifications.
//!
//! Each notification carries its own AES key, wrapped with the public half of
//! the key pair registered on the subscription. Opening one is three steps:
//!
//! 1. [`unwrap_key`] recovers the symmetric key with RSA-OAEP.
//! 2. [`validate`] checks `dataSignature` against the ciphertext.
//! 3. [`decrypt_payload`] decrypts and parses the resource data.
//!
//! [`open`] runs them in that order and refuses to decrypt anything whose
//! signature does not match. All functions are stateless and safe to call
//! from concurrent requests with a shared [`KeyPair`].

pub mod envelope;
pub mod error;
pub mod hybrid;
pub mod keys;
pub mod signature;

pub use envelope::{open, seal, ChangeNotification, ChangeNotificationCollection, EncryptedEnvelope};
pub use error::{CryptoError, Result};
pub use hybrid::{decrypt_bytes, decrypt_payload, encrypt_bytes, unwrap_key, wrap_key};
pub use keys::{certificate_body, KeyPair};
pub use signature::{sign, validate};
