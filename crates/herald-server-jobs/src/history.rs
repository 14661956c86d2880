// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded in-memory run log. Lost on restart, like the timers themselves.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::Utc;

use crate::types::{JobRun, JobStatus};

const MAX_RUNS_PER_JOB: usize = 32;

#[derive(Default)]
pub struct RunHistory {
	runs: Mutex<HashMap<String, VecDeque<JobRun>>>,
}

impl RunHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_start(&self, run: JobRun) {
		let mut runs = self.lock();
		let entries = runs.entry(run.job_id.clone()).or_default();
		if entries.len() == MAX_RUNS_PER_JOB {
			entries.pop_front();
		}
		entries.push_back(run);
	}

	pub fn record_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut runs = self.lock();
		let Some(run) = runs
			.get_mut(job_id)
			.and_then(|entries| entries.iter_mut().rev().find(|r| r.id == run_id))
		else {
			return;
		};
		let now = Utc::now();
		run.status = status;
		run.completed_at = Some(now);
		run.duration_ms = Some((now - run.started_at).num_milliseconds());
		run.error_message = error_message;
		run.metadata = metadata;
	}

	pub fn last_run(&self, job_id: &str) -> Option<JobRun> {
		self.lock().get(job_id).and_then(|e| e.back().cloned())
	}

	/// Failed runs since the most recent success.
	pub fn consecutive_failures(&self, job_id: &str) -> u32 {
		self.lock()
			.get(job_id)
			.map(|entries| {
				entries
					.iter()
					.rev()
					.filter(|r| r.status != JobStatus::Running)
					.take_while(|r| r.status == JobStatus::Failed)
					.count() as u32
			})
			.unwrap_or(0)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<JobRun>>> {
		// A panic while holding the lock leaves only a partially updated run record.
		self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
