// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token refresh and subscription renewal timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Graph caps chat message subscriptions with resource data at one hour.
pub const MAX_SUBSCRIPTION_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LifecycleConfigLayer {
	pub refresh_margin_secs: Option<u64>,
	pub subscription_lifetime_secs: Option<u64>,
	pub sweep_interval_secs: Option<u64>,
}

impl LifecycleConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.refresh_margin_secs.is_some() {
			self.refresh_margin_secs = other.refresh_margin_secs;
		}
		if other.subscription_lifetime_secs.is_some() {
			self.subscription_lifetime_secs = other.subscription_lifetime_secs;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
	}

	pub fn finalize(self) -> Result<LifecycleConfig, ConfigError> {
		let config = LifecycleConfig {
			refresh_margin_secs: self.refresh_margin_secs.unwrap_or(300),
			subscription_lifetime_secs: self.subscription_lifetime_secs.unwrap_or(3600),
			sweep_interval_secs: self.sweep_interval_secs.unwrap_or(3300),
		};
		config.validate()?;
		Ok(config)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleConfig {
	pub refresh_margin_secs: u64,
	pub subscription_lifetime_secs: u64,
	pub sweep_interval_secs: u64,
}

impl LifecycleConfig {
	pub fn refresh_margin(&self) -> Duration {
		Duration::from_secs(self.refresh_margin_secs)
	}

	pub fn subscription_lifetime(&self) -> Duration {
		Duration::from_secs(self.subscription_lifetime_secs)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_secs)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.refresh_margin_secs == 0 {
			return Err(ConfigError::validation(
				"lifecycle.refresh_margin_secs must be greater than zero",
			));
		}
		if self.sweep_interval_secs == 0 {
			return Err(ConfigError::validation(
				"lifecycle.sweep_interval_secs must be greater than zero",
			));
		}
		if self.subscription_lifetime_secs > MAX_SUBSCRIPTION_LIFETIME_SECS {
			return Err(ConfigError::validation(format!(
				"lifecycle.subscription_lifetime_secs must not exceed {MAX_SUBSCRIPTION_LIFETIME_SECS}"
			)));
		}
		if self.sweep_interval_secs >= self.subscription_lifetime_secs {
			return Err(ConfigError::validation(
				"lifecycle.sweep_interval_secs must be shorter than subscription_lifetime_secs, \
				 or subscriptions lapse between sweeps",
			));
		}
		Ok(())
	}
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			refresh_margin_secs: 300,
			subscription_lifetime_secs: 3600,
			sweep_interval_secs: 3300,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults() {
		let config = LifecycleConfigLayer::default().finalize().unwrap();
		assert_eq!(config, LifecycleConfig::default());
		assert_eq!(config.refresh_margin(), Duration::from_secs(300));
		assert_eq!(config.sweep_interval(), Duration::from_secs(55 * 60));
		assert_eq!(config.subscription_lifetime(), Duration::from_secs(3600));
	}

	#[test]
	fn test_zero_margin_rejected() {
		let layer = LifecycleConfigLayer {
			refresh_margin_secs: Some(0),
			..Default::default()
		};
		assert!(layer.finalize().is_err());
	}

	#[test]
	fn test_lifetime_above_graph_cap_rejected() {
		let layer = LifecycleConfigLayer {
			subscription_lifetime_secs: Some(7200),
			..Default::default()
		};
		assert!(layer.finalize().is_err());
	}

	proptest! {
		#[test]
		fn sweep_must_run_before_subscriptions_lapse(lifetime in 1u64..=3600, sweep in 1u64..=7200) {
			let layer = LifecycleConfigLayer {
				subscription_lifetime_secs: Some(lifetime),
				sweep_interval_secs: Some(sweep),
				..Default::default()
			};
			prop_assert_eq!(layer.finalize().is_ok(), sweep < lifetime);
		}
	}
}
