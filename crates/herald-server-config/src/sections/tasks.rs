// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plugin tasks run on a wall-clock schedule.
//!
//! ```toml
//! [[tasks]]
//! name = "weekday-digest"
//! plugin = "cloudflare"
//! task = "post_message"
//! day_of_week = "mon-fri"
//! hour = 8
//! minute = 30
//! args = { message = "Morning, the bot is up" }
//! ```
//!
//! Unset fields follow cron habits: `second` and `minute` default to 0,
//! `hour` and `day_of_week` to every value. Days are `mon`..`sun` or
//! `0` (Monday) to `6` (Sunday). Times are server local time.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::sections::plugins::PluginConfig;

const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A cron field written either as a number or as an expression such as `*/5`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CronField {
	Number(u32),
	Text(String),
}

impl fmt::Display for CronField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::Text(s) => f.write_str(s.trim()),
		}
	}
}

/// One `[[tasks]]` entry as written.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfigLayer {
	pub name: String,
	/// Name of the `[[plugins]]` entry that runs the task.
	pub plugin: String,
	pub task: String,
	#[serde(default)]
	pub args: Map<String, Value>,
	#[serde(default)]
	pub day_of_week: Option<CronField>,
	#[serde(default)]
	pub hour: Option<CronField>,
	#[serde(default)]
	pub minute: Option<CronField>,
	#[serde(default)]
	pub second: Option<CronField>,
}

impl TaskConfigLayer {
	pub fn finalize(self) -> Result<TaskConfig, ConfigError> {
		let field = |value: Option<CronField>, default: &str| {
			value.map_or_else(|| default.to_string(), |v| v.to_string())
		};
		let day_of_week = translate_days(&field(self.day_of_week, "*")).map_err(|message| {
			ConfigError::InvalidValue {
				key: format!("tasks.{}.day_of_week", self.name),
				message,
			}
		})?;
		let schedule = format!(
			"{} {} {} * * {} *",
			field(self.second, "0"),
			field(self.minute, "0"),
			field(self.hour, "*"),
			day_of_week,
		);

		Ok(TaskConfig {
			name: self.name,
			plugin: self.plugin,
			task: self.task,
			args: self.args,
			schedule,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
	pub name: String,
	pub plugin: String,
	pub task: String,
	pub args: Map<String, Value>,
	/// Seven-field cron expression: second minute hour day month weekday year.
	pub schedule: String,
}

pub fn finalize_tasks(
	layers: Vec<TaskConfigLayer>,
	plugins: &[PluginConfig],
) -> Result<Vec<TaskConfig>, ConfigError> {
	let tasks = layers
		.into_iter()
		.map(TaskConfigLayer::finalize)
		.collect::<Result<Vec<_>, _>>()?;

	let mut names = HashSet::new();
	for task in &tasks {
		if task.name.trim().is_empty() || task.task.trim().is_empty() {
			return Err(ConfigError::validation("tasks need a name and a task"));
		}
		if !names.insert(task.name.as_str()) {
			return Err(ConfigError::validation(format!(
				"task name '{}' is used more than once",
				task.name
			)));
		}
		if !plugins.iter().any(|p| p.name == task.plugin) {
			return Err(ConfigError::validation(format!(
				"task '{}' refers to unknown plugin '{}'",
				task.name, task.plugin
			)));
		}
	}
	Ok(tasks)
}

/// Rewrite day numbers and names into the `Mon`..`Sun` form, leaving
/// wildcards, ranges, lists and steps in place.
fn translate_days(field: &str) -> Result<String, String> {
	let mut out = String::with_capacity(field.len());
	let mut token = String::new();
	let mut step = false;
	for c in field.chars() {
		if c.is_ascii_alphanumeric() {
			token.push(c);
			continue;
		}
		out.push_str(&day_token(&token, step)?);
		token.clear();
		step = c == '/';
		out.push(c);
	}
	out.push_str(&day_token(&token, step)?);
	Ok(out)
}

fn day_token(token: &str, step: bool) -> Result<String, String> {
	if token.is_empty() || step {
		return Ok(token.to_string());
	}
	let day = match token.parse::<usize>() {
		Ok(n) => DAYS.get(n),
		Err(_) => DAYS.iter().find(|d| d.eq_ignore_ascii_case(token)),
	};
	day.map(|d| d.to_string())
		.ok_or_else(|| format!("'{token}' is not a day of the week"))
}
