// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrappers for the credentials Herald handles: OAuth client secrets, bearer
//! tokens, plugin shared secrets, vault passphrases and per-message symmetric
//! keys.
//!
//! A [`Secret<T>`] renders as `[REDACTED]` through `Debug`, `Display` and
//! `Serialize`, and its memory is zeroed when dropped. Reading the value
//! requires an explicit [`Secret::expose`] call.
//!
//! ```
//! use herald_common_secret::{SecretBytes, SecretString};
//!
//! let client_secret = SecretString::new("graph-client-secret".to_string());
//! assert_eq!(format!("{client_secret}"), "[REDACTED]");
//! assert_eq!(client_secret.expose(), "graph-client-secret");
//!
//! let key = SecretBytes::new(vec![0u8; 32]);
//! assert_eq!(format!("{key:?}"), "Secret(\"[REDACTED]\")");
//! ```

pub mod env;

use std::fmt;
use zeroize::Zeroize;

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};

/// Placeholder written wherever a secret would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value that cannot be printed, logged or serialized by accident.
///
/// There is deliberately no `Deref`; every read goes through [`Secret::expose`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Tokens, passwords and shared secrets.
pub type SecretString = Secret<String>;

/// Raw key material such as a recovered message key or a derived vault key.
pub type SecretBytes = Secret<Vec<u8>>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the protected value.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	pub fn expose_mut(&mut self) -> &mut T {
		&mut self.inner
	}

	/// Returns a copy of the value. The wrapper's own memory is still zeroed on drop.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl SecretString {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.inner.as_bytes()
	}
}

impl SecretBytes {
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl From<Vec<u8>> for SecretBytes {
	fn from(value: Vec<u8>) -> Self {
		Self::new(value)
	}
}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	// Written out as the placeholder so config dumps and API responses stay clean.
	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
