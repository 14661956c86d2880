// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wall-clock schedules for [`crate::JobType::Cron`], parsed with the `cron` crate.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use cron::Schedule;

use crate::error::{JobError, Result};

/// A parsed seven-field cron expression
/// (`second minute hour day-of-month month day-of-week year`).
#[derive(Clone)]
pub struct CronSchedule {
	expression: String,
	schedule: Schedule,
}

impl CronSchedule {
	pub fn parse(expression: &str) -> Result<Self> {
		let schedule = Schedule::from_str(expression).map_err(|e| JobError::InvalidSchedule {
			expression: expression.to_string(),
			message: e.to_string(),
		})?;
		Ok(Self {
			expression: expression.to_string(),
			schedule,
		})
	}

	pub fn expression(&self) -> &str {
		&self.expression
	}

	/// Time from `now` until the next occurrence, or `None` once the
	/// schedule has no future occurrences.
	pub fn delay_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Duration> {
		let next = self.schedule.after(now).next()?;
		(next - now.clone()).to_std().ok()
	}
}

impl std::fmt::Debug for CronSchedule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("CronSchedule").field(&self.expression).finish()
	}
}

impl PartialEq for CronSchedule {
	fn eq(&self, other: &Self) -> bool {
		self.expression == other.expression
	}
}

impl Eq for CronSchedule {}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn at(s: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
	}

	#[test]
	fn test_delay_to_next_weekday_morning() {
		let schedule = CronSchedule::parse("0 30 8 * * Mon-Fri *").unwrap();

		// Friday 09:00, so the next run is Monday 08:30.
		let delay = schedule.delay_after(&at("2025-03-07T09:00:00Z")).unwrap();
		assert_eq!(delay, Duration::from_secs(71 * 3600 + 30 * 60));

		// Monday 08:29:59.
		let delay = schedule.delay_after(&at("2025-03-10T08:29:59Z")).unwrap();
		assert_eq!(delay, Duration::from_secs(1));
	}

	#[test]
	fn test_occurrence_at_now_is_skipped() {
		let schedule = CronSchedule::parse("0 0 * * * * *").unwrap();
		let delay = schedule.delay_after(&at("2025-03-10T08:00:00Z")).unwrap();
		assert_eq!(delay, Duration::from_secs(3600));
	}

	#[test]
	fn test_past_only_schedule_has_no_delay() {
		let schedule = CronSchedule::parse("0 0 0 1 1 * 2020").unwrap();
		assert!(schedule.delay_after(&at("2025-03-10T08:00:00Z")).is_none());
	}

	#[test]
	fn test_invalid_expression() {
		match CronSchedule::parse("every tuesday") {
			Err(JobError::InvalidSchedule { expression, .. }) => assert_eq!(expression, "every tuesday"),
			other => panic!("expected InvalidSchedule, got {other:?}"),
		}
	}
}
