// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("Job failed: {message}")]
	Failed { message: String, retryable: bool },

	#[error("Job cancelled")]
	Cancelled,

	#[error("Job not found: {0}")]
	NotFound(String),

	#[error("Invalid schedule '{expression}': {message}")]
	InvalidSchedule { expression: String, message: String },
}

impl JobError {
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed {
			message: message.into(),
			retryable: false,
		}
	}

	/// A failure the next scheduled run may recover from.
	pub fn transient(message: impl Into<String>) -> Self {
		Self::Failed {
			message: message.into(),
			retryable: true,
		}
	}
}

pub type Result<T> = std::result::Result<T, JobError>;
