// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::CronSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
	Schedule,
	Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Running,
	Succeeded,
	Failed,
	Cancelled,
}

/// When a scheduled task fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobType {
	/// Once, after `delay`.
	OneShot { delay: Duration },
	/// First after `initial_delay`, then `interval` after each run finishes,
	/// whatever its outcome.
	Repeating {
		initial_delay: Duration,
		interval: Duration,
	},
	/// At each occurrence of the schedule in server local time.
	Cron(CronSchedule),
}

impl JobType {
	pub(crate) fn first_delay(&self) -> Option<Duration> {
		match self {
			Self::OneShot { delay } => Some(*delay),
			Self::Repeating { initial_delay, .. } => Some(*initial_delay),
			Self::Cron(schedule) => schedule.delay_after(&Local::now()),
		}
	}

	/// Delay before the run after the one that just finished.
	pub(crate) fn next_delay(&self) -> Option<Duration> {
		match self {
			Self::OneShot { .. } => None,
			Self::Repeating { interval, .. } => Some(*interval),
			Self::Cron(schedule) => schedule.delay_after(&Local::now()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
	pub message: String,
	pub metadata: Option<serde_json::Value>,
}

impl JobOutput {
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			metadata: None,
		}
	}
}

/// One execution of a job, kept in memory for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
	pub id: String,
	pub job_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	pub duration_ms: Option<i64>,
	pub error_message: Option<String>,
	pub triggered_by: TriggerSource,
	pub metadata: Option<serde_json::Value>,
}
