// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device credential vault.
//!
//! Credentials for managed devices are stored per device type, each encrypted
//! with a key derived from a master passphrase (PBKDF2-HMAC-SHA256) and the
//! record's own salt. The passphrase lives only in the process environment.
//!
//! ```no_run
//! use herald_vault::Vault;
//!
//! let vault = Vault::new("/etc/herald/secrets.toml");
//! let credential = vault.unlock("junos", "dc1-core-sw1")?;
//! println!("logging in as {}", credential.user);
//! # Ok::<(), herald_vault::VaultError>(())
//! ```

pub mod error;
pub mod fernet;
pub mod store;
mod vault;

pub use error::{Result, VaultError};
pub use store::{DeviceGroup, SecretRecord, SecretStore};
pub use vault::{master_passphrase, open_record, seal, Credential, Vault, MASTER_PASSPHRASE_VAR};
