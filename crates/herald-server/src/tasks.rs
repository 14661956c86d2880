// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plugin tasks configured under `[[tasks]]`, run on their cron schedule.

use std::sync::Arc;

use async_trait::async_trait;
use herald_plugin::{Plugin, PluginRegistry};
use herald_server_config::TaskConfig;
use herald_server_jobs::{CronSchedule, Job, JobContext, JobError, JobOutput};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::error::ServerError;

/// A configured task bound to the plugin that runs it.
pub struct PluginTaskJob {
	id: String,
	name: String,
	task: String,
	args: Map<String, Value>,
	plugin: Arc<dyn Plugin>,
}

impl PluginTaskJob {
	pub fn new(config: &TaskConfig, plugin: Arc<dyn Plugin>) -> Self {
		Self {
			id: format!("plugin-task:{}", config.name),
			name: config.name.clone(),
			task: config.task.clone(),
			args: config.args.clone(),
			plugin,
		}
	}
}

#[async_trait]
impl Job for PluginTaskJob {
	fn id(&self) -> &str {
		&self.id
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn description(&self) -> &str {
		&self.task
	}

	#[instrument(skip(self, _ctx), fields(task = %self.task, kind = self.plugin.kind()))]
	async fn run(&self, _ctx: &JobContext) -> Result<JobOutput, JobError> {
		self.plugin
			.run_task(&self.task, &self.args)
			.await
			.map_err(|e| JobError::transient(format!("task '{}' failed: {e}", self.name)))?;
		Ok(JobOutput::message(format!("Ran {} on {}", self.task, self.plugin.kind())))
	}
}

/// Pair each task with its plugin and parsed schedule.
pub fn plugin_tasks(
	tasks: &[TaskConfig],
	registry: &PluginRegistry,
) -> Result<Vec<(Arc<PluginTaskJob>, CronSchedule)>, ServerError> {
	tasks
		.iter()
		.map(|task| -> Result<_, ServerError> {
			let registration = registry
				.by_name(&task.plugin)
				.ok_or_else(|| ServerError::UnknownTaskPlugin {
					task: task.name.clone(),
					plugin: task.plugin.clone(),
				})?;
			let schedule = CronSchedule::parse(&task.schedule)?;
			info!(task = %task.name, plugin = %task.plugin, schedule = %task.schedule, "Plugin task configured");
			Ok((
				Arc::new(PluginTaskJob::new(task, Arc::clone(&registration.handler))),
				schedule,
			))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use herald_common_secret::SecretString;
	use herald_plugin::{AuthMode, PluginContext, PluginDefinition, PluginFactory};
	use herald_server_jobs::{CancellationToken, TriggerSource};

	fn registry() -> PluginRegistry {
		PluginFactory::with_builtins()
			.build(
				&[PluginDefinition {
					name: "audit".to_string(),
					route: "audit".to_string(),
					kind: "log".to_string(),
					auth_mode: AuthMode::Hmac,
					auth_header: "X-Signature".to_string(),
					secret: SecretString::from("s"),
					settings: Map::new(),
				}],
				&PluginContext::default(),
			)
			.unwrap()
	}

	fn task(name: &str, plugin: &str, task: &str, schedule: &str) -> TaskConfig {
		TaskConfig {
			name: name.to_string(),
			plugin: plugin.to_string(),
			task: task.to_string(),
			args: Map::new(),
			schedule: schedule.to_string(),
		}
	}

	fn ctx() -> JobContext {
		JobContext {
			run_id: "run".to_string(),
			triggered_by: TriggerSource::Manual,
			cancellation_token: CancellationToken::new(),
		}
	}

	#[tokio::test]
	async fn configured_task_runs_through_its_plugin() {
		let jobs = plugin_tasks(&[task("heartbeat", "audit", "log", "0 0 * * * * *")], &registry()).unwrap();
		let (job, schedule) = &jobs[0];

		assert_eq!(job.id(), "plugin-task:heartbeat");
		assert_eq!(schedule.expression(), "0 0 * * * * *");
		assert!(job.run(&ctx()).await.is_ok());
	}

	#[tokio::test]
	async fn unsupported_task_fails_the_run() {
		let jobs = plugin_tasks(&[task("bad", "audit", "rotate", "0 0 * * * * *")], &registry()).unwrap();
		let err = jobs[0].0.run(&ctx()).await.unwrap_err();
		assert!(err.to_string().contains("has no task 'rotate'"));
	}

	#[test]
	fn unknown_plugin_or_schedule_is_rejected() {
		assert!(matches!(
			plugin_tasks(&[task("x", "junos", "log", "0 0 * * * * *")], &registry()),
			Err(ServerError::UnknownTaskPlugin { .. })
		));
		assert!(matches!(
			plugin_tasks(&[task("x", "audit", "log", "0 0 25 * * * *")], &registry()),
			Err(ServerError::Schedule(_))
		));
	}
}
