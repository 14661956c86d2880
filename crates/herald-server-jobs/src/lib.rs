// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background task scheduler for Herald server.
//!
//! Token refresh, subscription renewal and plugin tasks run here, each as a
//! task tracked by a [`TaskHandle`] so it can be cancelled or replaced. Run
//! history and health are kept in memory only and reported on `/health`.

pub mod context;
pub mod error;
pub mod health;
mod history;
pub mod job;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use health::{worst, HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use job::Job;
pub use schedule::CronSchedule;
pub use scheduler::{JobScheduler, TaskHandle, TaskId};
pub use types::{JobOutput, JobRun, JobStatus, JobType, TriggerSource};
