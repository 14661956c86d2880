// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `herald-server vault` subcommands.

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context};
use herald_common_secret::{load_secret_env, SecretString};
use herald_vault::{seal, SecretStore, Vault};

/// Environment variable the password to seal can be taken from.
pub const VAULT_PASSWORD_VAR: &str = "HERALD_VAULT_PASSWORD";

/// Encrypt a credential and append it to the store at `path`, creating the
/// file when it does not exist yet.
pub fn seal_into_store(
	path: &Path,
	device_type: &str,
	pattern: &str,
	user: &str,
	password: &SecretString,
	passphrase: &SecretString,
) -> anyhow::Result<()> {
	let mut store = if path.exists() {
		SecretStore::load(path).with_context(|| format!("reading {}", path.display()))?
	} else {
		SecretStore::default()
	};

	let record = seal(pattern, user, password, passphrase).context("sealing credential")?;
	store.insert(device_type, record);

	let content = store.to_toml()?;
	std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
	Ok(())
}

/// The password to seal: `HERALD_VAULT_PASSWORD` (or `_FILE`), else the first
/// line of `input`.
pub fn read_password(input: impl BufRead) -> anyhow::Result<SecretString> {
	if let Some(password) = load_secret_env(VAULT_PASSWORD_VAR)? {
		return Ok(password);
	}

	let mut line = String::new();
	let mut input = input;
	input.read_line(&mut line).context("reading password from stdin")?;
	let password = line.trim_end_matches(['\r', '\n']).to_string();
	if password.is_empty() {
		bail!("no password given on stdin or in {VAULT_PASSWORD_VAR}");
	}
	Ok(SecretString::new(password))
}

/// Decrypt a credential and return its user. The password is not exposed.
pub fn check_unlock(path: &Path, device_type: &str, name: &str) -> anyhow::Result<String> {
	let credential = Vault::new(path)
		.unlock(device_type, name)
		.with_context(|| format!("unlocking {device_type}/{name}"))?;
	Ok(credential.user)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sealed_records_can_be_unlocked() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("secrets.toml");
		let passphrase = SecretString::from("master");

		seal_into_store(
			&path,
			"junos",
			"^dc1-",
			"netops",
			&SecretString::from("hunter2"),
			&passphrase,
		)
		.unwrap();
		seal_into_store(
			&path,
			"junos",
			".*",
			"fallback",
			&SecretString::from("other"),
			&passphrase,
		)
		.unwrap();

		let credential = Vault::new(&path)
			.unlock_with("junos", "dc1-core-sw1", &passphrase)
			.unwrap();
		assert_eq!(credential.user, "netops");
		assert_eq!(credential.password.expose(), "hunter2");

		let fallback = Vault::new(&path)
			.unlock_with("junos", "branch-sw", &passphrase)
			.unwrap();
		assert_eq!(fallback.user, "fallback");
	}

	#[test]
	fn password_is_read_from_the_first_line() {
		let password = read_password("s3cret\nignored\n".as_bytes()).unwrap();
		assert_eq!(password.expose(), "s3cret");
		assert!(read_password("\n".as_bytes()).is_err());
	}
}
