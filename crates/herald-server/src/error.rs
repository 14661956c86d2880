// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Failures while assembling the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
	#[error("failed to load private key: {0}")]
	PrivateKey(#[from] herald_graph_crypto::CryptoError),

	#[error("failed to read certificate {path}: {source}")]
	Certificate {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("plugin configuration error: {0}")]
	Plugin(#[from] herald_plugin::PluginError),

	#[error("graph client error: {0}")]
	Graph(#[from] herald_graph::GraphError),

	#[error("task '{task}' refers to plugin '{plugin}', which is not registered")]
	UnknownTaskPlugin { task: String, plugin: String },

	#[error("task schedule error: {0}")]
	Schedule(#[from] herald_server_jobs::JobError),
}
