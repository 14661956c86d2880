// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
	/// No constructor is registered for the configured kind.
	#[error("unknown plugin kind '{kind}' for plugin '{name}'")]
	UnknownKind { name: String, kind: String },

	/// A definition is missing a required setting or has an invalid one.
	#[error("invalid definition for plugin '{name}': {message}")]
	InvalidDefinition { name: String, message: String },

	/// Two plugins claim the same route.
	#[error("route '{0}' is registered by more than one plugin")]
	DuplicateRoute(String),

	/// The event could not be interpreted.
	#[error("malformed event: {0}")]
	MalformedEvent(String),

	/// The plugin kind has no scheduled task of this name.
	#[error("plugin kind '{kind}' has no task '{task}'")]
	UnknownTask { kind: String, task: String },

	/// A scheduled task was given arguments it cannot use.
	#[error("invalid arguments for task '{task}': {message}")]
	InvalidTaskArgs { task: String, message: String },

	/// A notification produced by the plugin could not be delivered.
	#[error("delivery failed: {0}")]
	Delivery(String),
}

impl PluginError {
	pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidDefinition {
			name: name.into(),
			message: message.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, PluginError>;
