// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
};
use herald_graph::{LifecycleError, SUBSCRIPTION_SWEEP_JOB_ID};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub error_description: Option<String>,
}

/// GET /callback - OAuth redirect target carrying the authorization code.
pub async fn authorization_callback(
	State(state): State<AppState>,
	Query(query): Query<CallbackQuery>,
) -> Response {
	if let Some(reason) = query.error {
		warn!(
			error = %reason,
			description = query.error_description.as_deref().unwrap_or_default(),
			"Authorization was declined"
		);
		return (
			StatusCode::BAD_REQUEST,
			"Authorization was not granted, this window can be closed",
		)
			.into_response();
	}

	let code = query.code.unwrap_or_default();
	match state.tokens.complete_authorization(&code).await {
		Ok(()) => {
			info!("Authorization complete; starting subscription sweep");
			let scheduler = state.scheduler.clone();
			tokio::spawn(async move {
				if let Err(e) = scheduler.trigger_job(SUBSCRIPTION_SWEEP_JOB_ID).await {
					warn!(error = %e, "Post-authorization subscription sweep failed");
				}
			});
			(
				StatusCode::OK,
				"Thank you for authenticating, this window can be closed",
			)
				.into_response()
		}
		Err(LifecycleError::MissingCode) => (
			StatusCode::BAD_REQUEST,
			"There has been a problem retrieving the client code",
		)
			.into_response(),
		Err(e) => {
			error!(error = %e, "Authorization callback failed");
			(
				StatusCode::BAD_GATEWAY,
				"Authorization failed, check the Herald log",
			)
				.into_response()
		}
	}
}
