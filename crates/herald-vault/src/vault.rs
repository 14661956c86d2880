// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use base64::Engine;
use herald_common_secret::{load_secret_env, SecretString};
use tracing::{debug, instrument, warn};

use crate::error::{Result, VaultError};
use crate::fernet::{self, URL_SAFE_B64};
use crate::store::{SecretRecord, SecretStore};

/// Environment variable holding the master passphrase (`_FILE` also accepted).
pub const MASTER_PASSPHRASE_VAR: &str = "HERALD_MASTER_PASSPHRASE";

/// A decrypted device credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	pub user: String,
	pub password: SecretString,
}

impl std::fmt::Debug for Credential {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credential")
			.field("user", &self.user)
			.field("password", &self.password)
			.finish()
	}
}

/// Handle to a secrets store on disk.
///
/// The file and the passphrase are both read on every [`Vault::unlock`], so
/// edits to the store take effect without a restart and the passphrase is
/// never cached.
#[derive(Debug, Clone)]
pub struct Vault {
	path: PathBuf,
}

impl Vault {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Look up and decrypt the credential for a device, using the passphrase
	/// from [`MASTER_PASSPHRASE_VAR`].
	pub fn unlock(&self, device_type: &str, name: &str) -> Result<Credential> {
		let passphrase = master_passphrase()?;
		self.unlock_with(device_type, name, &passphrase)
	}

	#[instrument(skip(self, passphrase), fields(store = %self.path.display()))]
	pub fn unlock_with(
		&self,
		device_type: &str,
		name: &str,
		passphrase: &SecretString,
	) -> Result<Credential> {
		let store = SecretStore::load(&self.path)?;
		let record = store.find(device_type, name).ok_or_else(|| {
			debug!("no matching secret record");
			VaultError::NotFound {
				device_type: device_type.to_string(),
				name: name.to_string(),
			}
		})?;

		open_record(record, passphrase).inspect_err(|_| {
			warn!(pattern = %record.pattern, "secret record failed to decrypt");
		})
	}
}

/// Decrypt a single record.
pub fn open_record(record: &SecretRecord, passphrase: &SecretString) -> Result<Credential> {
	let salt = URL_SAFE_B64
		.decode(record.salt.trim())
		.map_err(|_| VaultError::DecryptFailed)?;
	let key = fernet::derive_key(passphrase.as_bytes(), &salt);
	let plain = fernet::decrypt(&key, &record.secret)?;
	let password = std::str::from_utf8(&plain).map_err(|_| VaultError::DecryptFailed)?;

	Ok(Credential {
		user: record.user.clone(),
		password: SecretString::new(password.to_string()),
	})
}

/// Encrypt a new credential under `passphrase` with a fresh salt.
pub fn seal(
	pattern: &str,
	user: &str,
	password: &SecretString,
	passphrase: &SecretString,
) -> Result<SecretRecord> {
	if passphrase.is_empty() {
		return Err(VaultError::Seal("master passphrase must not be empty".into()));
	}
	let salt = fernet::generate_salt();
	let key = fernet::derive_key(passphrase.as_bytes(), &salt);
	let secret = fernet::encrypt(&key, password.as_bytes())?;

	Ok(SecretRecord {
		pattern: pattern.to_string(),
		user: user.to_string(),
		salt: URL_SAFE_B64.encode(salt),
		secret,
	})
}

pub fn master_passphrase() -> Result<SecretString> {
	match load_secret_env(MASTER_PASSPHRASE_VAR) {
		Ok(Some(passphrase)) if !passphrase.is_empty() => Ok(passphrase),
		Ok(_) => Err(VaultError::MissingPassphrase(MASTER_PASSPHRASE_VAR.to_string())),
		Err(e) => Err(VaultError::MissingPassphrase(e.to_string())),
	}
}
