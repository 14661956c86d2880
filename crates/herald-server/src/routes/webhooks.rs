// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound webhooks for configured plugins.

use std::net::{IpAddr, SocketAddr};

use axum::{
	body::to_bytes,
	extract::{ConnectInfo, Path, Request, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::api::AppState;

const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

/// POST /{route} - authenticate and dispatch to the plugin on `route`.
///
/// Known routes always answer "Webhook received", whether or not the request
/// authenticated.
#[instrument(skip(state, request))]
pub async fn plugin_webhook(
	State(state): State<AppState>,
	Path(route): Path<String>,
	request: Request,
) -> Response {
	let Some(registration) = state.plugins.get(&route) else {
		debug!("No plugin on route");
		return (StatusCode::NOT_FOUND, "Invalid path").into_response();
	};

	let peer = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|info| info.0.ip());
	let (parts, body) = request.into_parts();
	let source = source_ip(&parts.headers, peer);

	let body = match to_bytes(body, MAX_WEBHOOK_BODY).await {
		Ok(body) => body,
		Err(e) => {
			warn!(plugin = %registration.name, error = %e, "Failed to read webhook body");
			return webhook_received();
		}
	};

	let outcome = registration.authenticate(&parts.headers, &body);
	if !outcome.is_authenticated() {
		warn!(
			plugin = %registration.name,
			outcome = ?outcome,
			source = ?source,
			"Webhook failed authentication"
		);
		return webhook_received();
	}

	match serde_json::from_slice::<Value>(&body) {
		Ok(event) => {
			if let Err(e) = registration.handler.handle_event(event, source).await {
				warn!(plugin = %registration.name, error = %e, "Plugin failed to handle event");
			}
		}
		Err(e) => warn!(plugin = %registration.name, error = %e, "Webhook body is not JSON"),
	}

	webhook_received()
}

fn webhook_received() -> Response {
	(StatusCode::OK, "Webhook received").into_response()
}

/// First `X-Forwarded-For` entry when present and parseable, else the peer.
pub fn source_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
	headers
		.get("x-forwarded-for")
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(',').next())
		.and_then(|first| first.trim().parse().ok())
		.or(peer)
}
