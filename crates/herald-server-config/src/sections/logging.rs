// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use serde::{Deserialize, Serialize};

fn default_level() -> String {
	"info,tower_http::trace=debug".to_string()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

impl LogFormat {
	pub fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_lowercase().as_str() {
			"pretty" | "text" => Some(Self::Pretty),
			"json" => Some(Self::Json),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub format: Option<LogFormat>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(default_level),
			format: self.format.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
	/// `EnvFilter` directive used when `RUST_LOG` is unset.
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_level(),
			format: LogFormat::Pretty,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = LoggingConfigLayer::default().finalize();
		assert_eq!(config.level, "info,tower_http::trace=debug");
		assert_eq!(config.format, LogFormat::Pretty);
	}

	#[test]
	fn test_format_from_toml() {
		let layer: LoggingConfigLayer = toml::from_str(r#"format = "json""#).unwrap();
		assert_eq!(layer.format, Some(LogFormat::Json));
	}

	#[test]
	fn test_parse_format() {
		assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
		assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
		assert_eq!(LogFormat::parse("xml"), None);
	}
}
