// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk layout of the secrets store.
//!
//! ```toml
//! [[group]]
//! device_type = "junos"
//!
//! [[group.record]]
//! pattern = "core-sw"
//! user = "netops"
//! salt = "c2FsdHNhbHRzYWx0c2FsdA=="
//! secret = "gAAAAAB..."
//! ```
//!
//! Groups and records are arrays so lookup order is exactly file order.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretStore {
	#[serde(default, rename = "group")]
	pub groups: Vec<DeviceGroup>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceGroup {
	pub device_type: String,
	#[serde(default, rename = "record")]
	pub records: Vec<SecretRecord>,
}

/// One encrypted credential. `salt` is URL-safe base64, `secret` a Fernet token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretRecord {
	pub pattern: String,
	pub user: String,
	pub salt: String,
	pub secret: String,
}

impl SecretStore {
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|source| VaultError::StoreUnreadable {
			path: path.to_path_buf(),
			source,
		})?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self> {
		toml::from_str(content).map_err(|e| VaultError::StoreInvalid(e.message().to_string()))
	}

	pub fn to_toml(&self) -> Result<String> {
		toml::to_string(self).map_err(|e| VaultError::StoreInvalid(e.to_string()))
	}

	/// First record, in file order, within the first group for `device_type`
	/// whose pattern matches `name`.
	///
	/// A pattern matches when it is found anywhere in the name. Patterns are
	/// regular expressions; one that fails to compile is compared as a literal
	/// substring instead.
	pub fn find(&self, device_type: &str, name: &str) -> Option<&SecretRecord> {
		let group = self.groups.iter().find(|g| g.device_type == device_type)?;
		group
			.records
			.iter()
			.find(|record| pattern_matches(&record.pattern, name))
	}

	/// Append a record, creating the group when needed.
	pub fn insert(&mut self, device_type: &str, record: SecretRecord) {
		match self.groups.iter_mut().find(|g| g.device_type == device_type) {
			Some(group) => group.records.push(record),
			None => self.groups.push(DeviceGroup {
				device_type: device_type.to_string(),
				records: vec![record],
			}),
		}
	}
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
	match Regex::new(pattern) {
		Ok(re) => re.is_match(name),
		Err(_) => name.contains(pattern),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const STORE: &str = r#"
[[group]]
device_type = "junos"

[[group.record]]
pattern = "core"
user = "first"
salt = "AAAA"
secret = "x"

[[group.record]]
pattern = "core-sw1"
user = "second"
salt = "AAAA"
secret = "y"

[[group]]
device_type = "server"

[[group.record]]
pattern = "^db[0-9]+$"
user = "dba"
salt = "AAAA"
secret = "z"
"#;

	fn store() -> SecretStore {
		SecretStore::parse(STORE).unwrap()
	}

	#[test]
	fn first_match_in_file_order_wins() {
		// Both patterns are contained in the name; the earlier one is used.
		let record = store().find("junos", "dc1-core-sw1").unwrap().clone();
		assert_eq!(record.user, "first");
	}

	#[test]
	fn match_is_containment_not_equality() {
		assert_eq!(store().find("junos", "edge-core-02").unwrap().user, "first");
		assert!(store().find("junos", "edge-sw-02").is_none());
	}

	#[test]
	fn lookup_is_scoped_to_the_device_type() {
		assert!(store().find("server", "dc1-core-sw1").is_none());
		assert!(store().find("cisco", "core").is_none());
	}

	#[test]
	fn patterns_are_regular_expressions() {
		assert_eq!(store().find("server", "db12").unwrap().user, "dba");
		assert!(store().find("server", "db12-replica").is_none());
	}

	#[test]
	fn invalid_regex_falls_back_to_literal_containment() {
		let mut store = SecretStore::default();
		store.insert(
			"junos",
			SecretRecord {
				pattern: "rack[7".into(),
				user: "literal".into(),
				salt: "AAAA".into(),
				secret: "s".into(),
			},
		);
		assert_eq!(store.find("junos", "dc-rack[7-a").unwrap().user, "literal");
		assert!(store.find("junos", "dc-rack7").is_none());
	}

	#[test]
	fn insert_appends_and_serializes_in_order() {
		let mut store = store();
		store.insert(
			"junos",
			SecretRecord {
				pattern: "edge".into(),
				user: "third".into(),
				salt: "AAAA".into(),
				secret: "w".into(),
			},
		);

		let reparsed = SecretStore::parse(&store.to_toml().unwrap()).unwrap();
		let users: Vec<_> = reparsed.groups[0].records.iter().map(|r| r.user.as_str()).collect();
		assert_eq!(users, ["first", "second", "third"]);
		assert_eq!(reparsed.groups[1].device_type, "server");
	}

	#[test]
	fn invalid_toml_is_reported() {
		assert!(matches!(
			SecretStore::parse("[[group]]\ndevice_type = 3"),
			Err(VaultError::StoreInvalid(_))
		));
	}

	#[test]
	fn missing_file_is_unreadable() {
		assert!(matches!(
			SecretStore::load(Path::new("/nonexistent/herald/secrets.toml")),
			Err(VaultError::StoreUnreadable { .. })
		));
	}
}
