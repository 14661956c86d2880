// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reading secrets from the process environment.
//!
//! Every secret variable `VAR` may instead be supplied as a file path through
//! `VAR_FILE` (the Docker/Kubernetes mounted-secret convention). The file form
//! wins when both are set.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

use crate::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}

/// Look up `var`, honouring `{var}_FILE`. A single trailing newline in the
/// file is dropped.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

/// Like [`load_secret_env`] but absence is an error.
pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	// Each test owns a distinct variable name so they can run in parallel.

	#[test]
	fn unset_variable_is_none() {
		let var = "HERALD_TEST_SECRET_UNSET";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));

		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn direct_value_is_used() {
		let var = "HERALD_TEST_SECRET_DIRECT";
		env::remove_var(format!("{var}_FILE"));
		env::set_var(var, "client-secret");

		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "client-secret");
		env::remove_var(var);
	}

	#[test]
	fn file_takes_precedence_and_trailing_newline_is_stripped() {
		let var = "HERALD_TEST_SECRET_FROM_FILE";
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "mounted-secret").unwrap();

		env::set_var(var, "ignored");
		env::set_var(format!("{var}_FILE"), file.path());

		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "mounted-secret");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn empty_file_path_is_rejected() {
		let var = "HERALD_TEST_SECRET_EMPTY_PATH";
		env::set_var(format!("{var}_FILE"), "");

		let err = load_secret_env(var).unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { .. }));
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn unreadable_file_is_an_io_error() {
		let var = "HERALD_TEST_SECRET_MISSING_FILE";
		env::set_var(format!("{var}_FILE"), "/nonexistent/herald/secret");

		let err = load_secret_env(var).unwrap_err();
		assert!(matches!(err, SecretEnvError::Io { .. }));
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn required_secret_reports_both_names() {
		let var = "HERALD_TEST_SECRET_REQUIRED";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));

		let err = require_secret_env(var).unwrap_err();
		let message = err.to_string();
		assert!(message.contains(var));
		assert!(message.contains("HERALD_TEST_SECRET_REQUIRED_FILE"));
	}
}
