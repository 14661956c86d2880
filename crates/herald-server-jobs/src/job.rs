// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;
use crate::types::JobOutput;

/// A unit of background work.
///
/// The scheduler never retries a failed run. A one-shot job that fails stays
/// failed; a repeating job simply runs again at its next interval. Long jobs
/// should check `ctx.cancellation_token` between steps.
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable identifier used for history and health reporting.
	fn id(&self) -> &str;

	fn name(&self) -> &str;

	fn description(&self) -> &str {
		""
	}

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}
