// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Herald server.
//!
//! Layered from built-in defaults, a TOML file and `HERALD_SERVER_*`
//! environment variables, in that order of increasing precedence.
//!
//! ```ignore
//! use herald_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH};

use std::path::PathBuf;

use tracing::{debug, info, warn};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub graph: GraphConfig,
	pub teams: TeamsConfig,
	pub paths: PathsConfig,
	pub lifecycle: LifecycleConfig,
	pub logging: LoggingConfig,
	pub plugins: Vec<PluginConfig>,
	pub tasks: Vec<TaskConfig>,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HERALD_SERVER_*`)
/// 2. Config file (`/etc/herald/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let graph = layer.graph.unwrap_or_default().finalize(&http)?;
	let teams = layer.teams.unwrap_or_default().finalize()?;
	let paths = layer.paths.unwrap_or_default().finalize();
	let lifecycle = layer.lifecycle.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();
	let plugins = sections::plugins::finalize_plugins(layer.plugins.unwrap_or_default())?;
	let tasks = sections::tasks::finalize_tasks(layer.tasks.unwrap_or_default(), &plugins)?;

	if !teams.subscribe_all && teams.approved_chat_ids.is_empty() {
		warn!("No approved chats and subscribe_all is off; Herald will not subscribe to any chat");
	}
	info!(
		host = %http.host,
		port = http.port,
		tenant = %graph.tenant,
		subscribe_all = teams.subscribe_all,
		approved_chats = teams.approved_chat_ids.len(),
		admin_alerts = graph.admin_chat_id.is_some(),
		plugins = plugins.len(),
		weak_plugins = plugins
			.iter()
			.filter(|p| p.auth_mode == PluginAuthMode::PlainHeaderWeak)
			.count(),
		tasks = tasks.len(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		graph,
		teams,
		paths,
		lifecycle,
		logging,
		plugins,
		tasks,
	})
}
