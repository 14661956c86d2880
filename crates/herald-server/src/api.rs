// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use axum::{
	routing::{get, post},
	Router,
};
use herald_graph::{OperatorNotifier, TokenManager};
use herald_graph_crypto::KeyPair;
use herald_plugin::{ChatSender, PluginRegistry};
use herald_server_config::TeamsConfig;
use herald_server_jobs::JobScheduler;

use crate::router::MessageRouter;
use crate::routes;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub port: u16,
	pub key_pair: Arc<KeyPair>,
	pub teams: Arc<TeamsConfig>,
	pub plugins: Arc<PluginRegistry>,
	pub tokens: Arc<TokenManager>,
	pub scheduler: JobScheduler,
	/// Outbound chat, used for replies to unapproved chats.
	pub chat: Arc<dyn ChatSender>,
	pub notifier: Arc<dyn OperatorNotifier>,
	pub router: Arc<dyn MessageRouter>,
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/test", get(routes::health::liveness))
		.route("/health", get(routes::health::health_check))
		.route("/callback", get(routes::callback::authorization_callback))
		.route("/chat", post(routes::chat::change_notification))
		.route("/{route}", post(routes::webhooks::plugin_webhook))
		.with_state(state)
}
