// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use herald_common_secret::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	GraphConfigLayer, HttpConfigLayer, LifecycleConfigLayer, LogFormat, LoggingConfigLayer,
	PathsConfigLayer, TeamsConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/herald/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: HERALD_SERVER_<SECTION>_<FIELD>. Plugins are file-only.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			graph: Some(load_graph_from_env()?),
			teams: Some(load_teams_from_env()),
			paths: Some(load_paths_from_env()),
			lifecycle: Some(load_lifecycle_from_env()?),
			logging: Some(load_logging_from_env()?),
			plugins: None,
			tasks: None,
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("HERALD_SERVER_HOST"),
		port: env_u16("HERALD_SERVER_PORT")?,
		base_url: env_var("HERALD_SERVER_BASE_URL"),
	})
}

fn load_graph_from_env() -> Result<GraphConfigLayer, ConfigError> {
	Ok(GraphConfigLayer {
		base_url: env_var("HERALD_SERVER_GRAPH_BASE_URL"),
		login_url: env_var("HERALD_SERVER_GRAPH_LOGIN_URL"),
		tenant: env_var("HERALD_SERVER_GRAPH_TENANT"),
		client_id: env_var("HERALD_SERVER_GRAPH_CLIENT_ID"),
		client_secret: load_secret_env("HERALD_SERVER_GRAPH_CLIENT_SECRET")
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
		redirect_url: env_var("HERALD_SERVER_GRAPH_REDIRECT_URL"),
		login_hint: env_var("HERALD_SERVER_GRAPH_LOGIN_HINT"),
		notification_url: env_var("HERALD_SERVER_GRAPH_NOTIFICATION_URL"),
		encryption_certificate_id: env_var("HERALD_SERVER_GRAPH_ENCRYPTION_CERTIFICATE_ID"),
		admin_chat_id: env_var("HERALD_SERVER_GRAPH_ADMIN_CHAT_ID"),
	})
}

fn load_teams_from_env() -> TeamsConfigLayer {
	TeamsConfigLayer {
		user_id: env_var("HERALD_SERVER_TEAMS_USER_ID"),
		subscribe_all: env_bool("HERALD_SERVER_TEAMS_SUBSCRIBE_ALL"),
		approved_chat_ids: env_list("HERALD_SERVER_TEAMS_APPROVED_CHAT_IDS"),
		chatbot_name: env_var("HERALD_SERVER_TEAMS_CHATBOT_NAME"),
	}
}

fn load_paths_from_env() -> PathsConfigLayer {
	PathsConfigLayer {
		private_key: env_var("HERALD_SERVER_PRIVATE_KEY").map(PathBuf::from),
		public_certificate: env_var("HERALD_SERVER_PUBLIC_CERTIFICATE").map(PathBuf::from),
		token_file: env_var("HERALD_SERVER_TOKEN_FILE").map(PathBuf::from),
		secrets_file: env_var("HERALD_SERVER_SECRETS_FILE").map(PathBuf::from),
	}
}

fn load_lifecycle_from_env() -> Result<LifecycleConfigLayer, ConfigError> {
	Ok(LifecycleConfigLayer {
		refresh_margin_secs: env_u64("HERALD_SERVER_REFRESH_MARGIN_SECS")?,
		subscription_lifetime_secs: env_u64("HERALD_SERVER_SUBSCRIPTION_LIFETIME_SECS")?,
		sweep_interval_secs: env_u64("HERALD_SERVER_SWEEP_INTERVAL_SECS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("HERALD_SERVER_LOG_FORMAT") {
		Some(v) => Some(LogFormat::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
			key: "HERALD_SERVER_LOG_FORMAT".to_string(),
			message: format!("expected 'pretty' or 'json', got '{v}'"),
		})?),
		None => None,
	};
	Ok(LoggingConfigLayer {
		level: env_var("HERALD_SERVER_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let layer = TomlSource::new("/nonexistent/herald.toml").load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.graph.is_none());
	}

	#[test]
	fn test_toml_source_parses_sections() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(
			&path,
			r#"
[http]
port = 5000

[graph]
tenant = "contoso"

[teams]
approved_chat_ids = ["19:a", "19:b"]
"#,
		)
		.unwrap();

		let layer = TomlSource::new(&path).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(5000));
		assert_eq!(layer.graph.unwrap().tenant.as_deref(), Some("contoso"));
		assert_eq!(
			layer.teams.unwrap().approved_chat_ids,
			Some(vec!["19:a".to_string(), "19:b".to_string()])
		);
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[http\nport = ").unwrap();
		assert!(matches!(
			TomlSource::new(&path).load(),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn test_env_helpers() {
		std::env::set_var("HERALD_TEST_CFG_LIST", " 19:a, ,19:b ");
		assert_eq!(
			env_list("HERALD_TEST_CFG_LIST"),
			Some(vec!["19:a".to_string(), "19:b".to_string()])
		);

		std::env::set_var("HERALD_TEST_CFG_BOOL", "1");
		assert_eq!(env_bool("HERALD_TEST_CFG_BOOL"), Some(true));

		std::env::set_var("HERALD_TEST_CFG_EMPTY", "");
		assert_eq!(env_var("HERALD_TEST_CFG_EMPTY"), None);

		std::env::set_var("HERALD_TEST_CFG_PORT", "not-a-port");
		assert!(matches!(
			env_u16("HERALD_TEST_CFG_PORT"),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
