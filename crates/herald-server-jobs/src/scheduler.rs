// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{determine_health_state, worst, JobHealthStatus, JobsHealthStatus};
use crate::history::RunHistory;
use crate::job::Job;
use crate::schedule::CronSchedule;
use crate::types::{JobRun, JobStatus, JobType, TriggerSource};

pub type TaskId = Uuid;

/// Handle to one scheduled task. Cancelling wakes the task and stops it before
/// its next run; a run already in progress sees the flag through its context.
#[derive(Clone)]
pub struct TaskHandle {
	id: TaskId,
	job_id: String,
	token: CancellationToken,
}

impl TaskHandle {
	pub fn id(&self) -> TaskId {
		self.id
	}

	pub fn cancel(&self) {
		self.token.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}
}

impl std::fmt::Debug for TaskHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskHandle")
			.field("id", &self.id)
			.field("job_id", &self.job_id)
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

struct ScheduledTask {
	job_id: String,
	token: CancellationToken,
	handle: JoinHandle<()>,
}

struct Shared {
	jobs: Mutex<HashMap<String, Arc<dyn Job>>>,
	tasks: Mutex<HashMap<TaskId, ScheduledTask>>,
	history: RunHistory,
	shutdown_tx: broadcast::Sender<()>,
}

/// Runs one-shot and repeating jobs on tokio timers.
///
/// Cloning is cheap and every clone drives the same set of tasks. Nothing is
/// persisted: pending timers and run history end with the process.
#[derive(Clone)]
pub struct JobScheduler {
	shared: Arc<Shared>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			shared: Arc::new(Shared {
				jobs: Mutex::new(HashMap::new()),
				tasks: Mutex::new(HashMap::new()),
				history: RunHistory::new(),
				shutdown_tx,
			}),
		}
	}

	/// Make a job known for [`JobScheduler::trigger_job`] and health reporting
	/// without scheduling it.
	pub fn register(&self, job: Arc<dyn Job>) {
		lock(&self.shared.jobs).insert(job.id().to_string(), job);
	}

	/// Run `job` once after `delay`.
	pub fn schedule_once(&self, job: Arc<dyn Job>, delay: Duration) -> TaskHandle {
		self.spawn(job, JobType::OneShot { delay })
	}

	/// Run `job` after `initial_delay`, then again `interval` after each run ends.
	pub fn schedule_repeating(
		&self,
		job: Arc<dyn Job>,
		initial_delay: Duration,
		interval: Duration,
	) -> TaskHandle {
		self.spawn(
			job,
			JobType::Repeating {
				initial_delay,
				interval,
			},
		)
	}

	/// Run `job` at every occurrence of `schedule`.
	pub fn schedule_cron(&self, job: Arc<dyn Job>, schedule: CronSchedule) -> TaskHandle {
		self.spawn(job, JobType::Cron(schedule))
	}

	fn spawn(&self, job: Arc<dyn Job>, job_type: JobType) -> TaskHandle {
		self.register(Arc::clone(&job));

		let id = Uuid::new_v4();
		let job_id = job.id().to_string();
		let token = CancellationToken::new();
		let first_deadline = job_type.first_delay().map(|delay| Instant::now() + delay);
		if first_deadline.is_none() {
			warn!(job_id = %job_id, schedule = ?job_type, "Schedule has no future runs");
		}

		// Held across the spawn so the task cannot finish and deregister before
		// it has been inserted.
		let mut tasks = lock(&self.shared.tasks);
		info!(job_id = %job_id, task_id = %id, schedule = ?job_type, "Scheduled job");

		let shared = Arc::clone(&self.shared);
		let task_token = token.clone();
		let mut shutdown_rx = self.shared.shutdown_tx.subscribe();
		let handle = tokio::spawn(async move {
			let mut deadline = first_deadline;
			while let Some(at) = deadline {
				tokio::select! {
					_ = tokio::time::sleep_until(at) => {}
					_ = task_token.cancelled() => {
						debug!(job_id = %job.id(), "scheduled task cancelled");
						break;
					}
					_ = shutdown_rx.recv() => {
						info!(job_id = %job.id(), "Shutting down scheduled task");
						break;
					}
				}

				let _ = run_job(&job, &shared.history, TriggerSource::Schedule, &task_token).await;

				deadline = if task_token.is_cancelled() {
					None
				} else {
					job_type.next_delay().map(|delay| Instant::now() + delay)
				};
			}
			lock(&shared.tasks).remove(&id);
		});

		tasks.insert(
			id,
			ScheduledTask {
				job_id: job_id.clone(),
				token: token.clone(),
				handle,
			},
		);

		TaskHandle { id, job_id, token }
	}

	/// Run a known job immediately, outside its schedule.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str) -> Result<String> {
		let job = lock(&self.shared.jobs)
			.get(job_id)
			.cloned()
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job(
			&job,
			&self.shared.history,
			TriggerSource::Manual,
			&CancellationToken::new(),
		)
		.await
	}

	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shared.shutdown_tx.send(());

		let handles: Vec<JoinHandle<()>> = {
			let mut tasks = lock(&self.shared.tasks);
			tasks
				.drain()
				.map(|(_, task)| {
					task.token.cancel();
					task.handle
				})
				.collect()
		};
		join_all(handles).await;

		info!("Job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		lock(&self.shared.jobs).keys().cloned().collect()
	}

	pub fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let name = lock(&self.shared.jobs).get(job_id)?.name().to_string();
		let pending = lock(&self.shared.tasks)
			.values()
			.any(|t| t.job_id == job_id && !t.token.is_cancelled());

		let last_run = self.shared.history.last_run(job_id);
		let consecutive_failures = self.shared.history.consecutive_failures(job_id);

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name,
			status: determine_health_state(last_run.as_ref(), consecutive_failures),
			pending,
			last_run: last_run.map(Into::into),
			consecutive_failures,
		})
	}

	pub fn health_status(&self) -> JobsHealthStatus {
		let mut jobs: Vec<JobHealthStatus> = self
			.job_ids()
			.iter()
			.filter_map(|id| self.job_status(id))
			.collect();
		jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));

		JobsHealthStatus {
			status: worst(jobs.iter().map(|j| j.status)),
			jobs,
		}
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_job(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	triggered_by: TriggerSource,
	cancellation_token: &CancellationToken,
) -> Result<String> {
	let run_id = Uuid::new_v4().to_string();
	let ctx = JobContext {
		run_id: run_id.clone(),
		triggered_by,
		cancellation_token: cancellation_token.clone(),
	};

	history.record_start(JobRun {
		id: run_id.clone(),
		job_id: job.id().to_string(),
		status: JobStatus::Running,
		started_at: Utc::now(),
		completed_at: None,
		duration_ms: None,
		error_message: None,
		triggered_by,
		metadata: None,
	});

	match job.run(&ctx).await {
		Ok(output) => {
			history.record_complete(job.id(), &run_id, JobStatus::Succeeded, None, output.metadata);
			info!(job_id = %job.id(), run_id = %run_id, message = %output.message, "Job completed successfully");
			Ok(run_id)
		}
		Err(JobError::Cancelled) => {
			history.record_complete(job.id(), &run_id, JobStatus::Cancelled, None, None);
			info!(job_id = %job.id(), run_id = %run_id, "Job cancelled");
			Err(JobError::Cancelled)
		}
		Err(e) => {
			let message = e.to_string();
			history.record_complete(job.id(), &run_id, JobStatus::Failed, Some(message.clone()), None);
			warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed");
			Err(e)
		}
	}
}
