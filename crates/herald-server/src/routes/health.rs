// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Liveness and health HTTP handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use herald_graph::LifecycleState;
use herald_server_jobs::{worst, HealthState, JobsHealthStatus};
use serde::Serialize;

use crate::api::AppState;

/// GET /test - plain text liveness check.
pub async fn liveness(State(state): State<AppState>) -> String {
	format!("Herald is running on port {}", state.port)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthState,
	pub timestamp: String,
	pub version: &'static str,
	pub lifecycle: LifecycleHealth,
	pub jobs: JobsHealthStatus,
}

#[derive(Debug, Serialize)]
pub struct LifecycleHealth {
	pub status: HealthState,
	pub state: LifecycleState,
}

/// Waiting on consent is degraded; a failed refresh needs the operator.
pub fn lifecycle_health(state: LifecycleState) -> HealthState {
	match state {
		LifecycleState::TokenAcquired
		| LifecycleState::RefreshScheduled
		| LifecycleState::RefreshInFlight => HealthState::Healthy,
		LifecycleState::Unauthenticated | LifecycleState::AuthorizationRequested => {
			HealthState::Degraded
		}
		LifecycleState::RefreshFailed => HealthState::Unhealthy,
	}
}

/// GET /health - token lifecycle and background job health as JSON.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let lifecycle_state = state.tokens.state();
	let lifecycle = LifecycleHealth {
		status: lifecycle_health(lifecycle_state),
		state: lifecycle_state,
	};
	let jobs = state.scheduler.health_status();
	let status = worst([lifecycle.status, jobs.status]);

	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		version: env!("CARGO_PKG_VERSION"),
		lifecycle,
		jobs,
	};

	let http_status = match status {
		HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
		HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
