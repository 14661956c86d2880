// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The bearer token, where it lives in memory and how it is persisted.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{GraphError, Result};

/// An access token plus what is needed to renew it.
#[derive(Debug, Clone)]
pub struct BearerToken {
	pub access_token: SecretString,
	pub refresh_token: SecretString,
	/// Lifetime in seconds, as reported by the login endpoint.
	pub expires_in: u64,
	pub acquired_at: DateTime<Utc>,
}

impl BearerToken {
	pub fn expires_at(&self) -> DateTime<Utc> {
		self.acquired_at + chrono::Duration::seconds(self.expires_in as i64)
	}

	/// Delay from `now` until this token should be refreshed, `margin`
	/// before it expires. Zero when that moment has already passed.
	pub fn refresh_delay(&self, margin: Duration, now: DateTime<Utc>) -> Duration {
		let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
		(self.expires_at() - margin - now).to_std().unwrap_or(Duration::ZERO)
	}
}

/// On-disk form. `acquired_at` is absent in files written by older tooling.
#[derive(Serialize, Deserialize)]
struct StoredToken {
	access_token: String,
	refresh_token: String,
	expires_in: u64,
	#[serde(default = "Utc::now")]
	acquired_at: DateTime<Utc>,
}

impl From<&BearerToken> for StoredToken {
	fn from(token: &BearerToken) -> Self {
		Self {
			access_token: token.access_token.expose().clone(),
			refresh_token: token.refresh_token.expose().clone(),
			expires_in: token.expires_in,
			acquired_at: token.acquired_at,
		}
	}
}

impl From<StoredToken> for BearerToken {
	fn from(stored: StoredToken) -> Self {
		Self {
			access_token: SecretString::new(stored.access_token),
			refresh_token: SecretString::new(stored.refresh_token),
			expires_in: stored.expires_in,
			acquired_at: stored.acquired_at,
		}
	}
}

/// The token that outbound calls present.
///
/// Only the lifecycle manager writes it; everything else reads.
#[derive(Debug, Default)]
pub struct TokenCell {
	current: RwLock<Option<BearerToken>>,
}

impl TokenCell {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token(token: BearerToken) -> Self {
		Self {
			current: RwLock::new(Some(token)),
		}
	}

	pub fn get(&self) -> Option<BearerToken> {
		self.current
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}

	/// The access token for an `Authorization` header.
	pub fn bearer(&self) -> Result<SecretString> {
		self.get()
			.map(|t| t.access_token)
			.ok_or(GraphError::NotAuthenticated)
	}

	pub(crate) fn set(&self, token: BearerToken) {
		*self
			.current
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
	}
}

/// Durable storage for the current bearer token. Each save replaces the
/// previous token wholesale.
#[async_trait]
pub trait TokenStore: Send + Sync {
	async fn load(&self) -> Result<Option<BearerToken>>;
	async fn save(&self, token: &BearerToken) -> Result<()>;
}

/// JSON file store. Writes go to a sibling temp file that is synced, restricted
/// to the owner and then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
	path: PathBuf,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let name = self
			.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| "token".to_string());
		self.path.with_file_name(format!(".{name}.tmp"))
	}
}

#[async_trait]
impl TokenStore for FileTokenStore {
	async fn load(&self) -> Result<Option<BearerToken>> {
		let content = match tokio::fs::read_to_string(&self.path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(GraphError::token_store(format!("{}: {e}", self.path.display()))),
		};
		if content.trim().is_empty() {
			return Ok(None);
		}
		let stored: StoredToken = serde_json::from_str(&content)
			.map_err(|e| GraphError::token_store(format!("{}: {e}", self.path.display())))?;
		Ok(Some(stored.into()))
	}

	async fn save(&self, token: &BearerToken) -> Result<()> {
		let json = serde_json::to_vec_pretty(&StoredToken::from(token)).map_err(GraphError::token_store)?;
		let tmp = self.temp_path();

		let mut file = tokio::fs::File::create(&tmp)
			.await
			.map_err(GraphError::token_store)?;
		file.write_all(&json).await.map_err(GraphError::token_store)?;
		file.sync_all().await.map_err(GraphError::token_store)?;
		drop(file);

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
				.await
				.map_err(GraphError::token_store)?;
		}

		tokio::fs::rename(&tmp, &self.path)
			.await
			.map_err(GraphError::token_store)?;
		debug!(path = %self.path.display(), "saved bearer token");
		Ok(())
	}
}

/// Store that keeps the token in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	token: Mutex<Option<BearerToken>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
	async fn load(&self) -> Result<Option<BearerToken>> {
		Ok(self
			.token
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone())
	}

	async fn save(&self, token: &BearerToken) -> Result<()> {
		*self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.clone());
		Ok(())
	}
}
