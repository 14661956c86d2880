// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assembles the server from configuration.

use std::sync::Arc;
use std::time::Duration;

use herald_graph::{
	notification_resources, FileTokenStore, GraphChatNotifier, GraphClient, LifecycleError,
	LogNotifier, OAuthClient, OAuthConfig, OperatorNotifier, SubscriptionManager,
	SubscriptionSettings, SubscriptionSweepJob, TokenCell, TokenManager,
};
use herald_graph_crypto::{certificate_body, KeyPair};
use herald_plugin::{AuthMode, ChatSender, PluginContext, PluginDefinition, PluginFactory};
use herald_server_config::{PluginAuthMode, PluginConfig, ServerConfig};
use herald_server_jobs::{CronSchedule, Job, JobScheduler, TaskHandle};
use tracing::info;

use crate::api::AppState;
use crate::chat_sender::GraphChatSender;
use crate::error::ServerError;
use crate::router::{LoggingRouter, MessageRouter};
use crate::tasks::{plugin_tasks, PluginTaskJob};

/// Map configured plugins onto factory definitions.
pub fn plugin_definitions(plugins: &[PluginConfig]) -> Vec<PluginDefinition> {
	plugins
		.iter()
		.map(|plugin| PluginDefinition {
			name: plugin.name.clone(),
			route: plugin.route.clone(),
			kind: plugin.kind.clone(),
			auth_mode: match plugin.auth_mode {
				PluginAuthMode::Hmac => AuthMode::Hmac,
				PluginAuthMode::PlainHeaderWeak => AuthMode::PlainHeaderWeak,
			},
			auth_header: plugin.auth_header.clone(),
			secret: plugin.secret.clone(),
			settings: plugin.settings.clone(),
		})
		.collect()
}

/// Everything the running server owns.
pub struct Herald {
	pub state: AppState,
	pub subscriptions: Arc<SubscriptionManager>,
	tasks: Vec<(Arc<PluginTaskJob>, CronSchedule)>,
	sweep_interval: Duration,
}

impl Herald {
	/// Load key material, build clients and the plugin registry. Nothing is
	/// scheduled until [`Herald::start`].
	pub fn build(config: &ServerConfig) -> Result<Self, ServerError> {
		Self::build_with_router(config, Arc::new(LoggingRouter))
	}

	pub fn build_with_router(
		config: &ServerConfig,
		router: Arc<dyn MessageRouter>,
	) -> Result<Self, ServerError> {
		let key_pair = Arc::new(KeyPair::load(&config.paths.private_key)?);
		let certificate = std::fs::read_to_string(&config.paths.public_certificate).map_err(|source| {
			ServerError::Certificate {
				path: config.paths.public_certificate.clone(),
				source,
			}
		})?;

		let http = herald_graph::http::new_client()?;
		let graph = GraphClient::with_http(http.clone(), &config.graph.base_url)?;
		let tokens = Arc::new(TokenCell::new());

		let notifier: Arc<dyn OperatorNotifier> = match &config.graph.admin_chat_id {
			Some(chat_id) => Arc::new(GraphChatNotifier::new(
				graph.clone(),
				Arc::clone(&tokens),
				chat_id.clone(),
			)),
			None => {
				info!("No admin chat configured; operator alerts go to the log only");
				Arc::new(LogNotifier)
			}
		};

		let oauth = OAuthClient::with_http(
			http,
			OAuthConfig {
				login_url: config.graph.login_url.clone(),
				tenant: config.graph.tenant.clone(),
				client_id: config.graph.client_id.clone(),
				client_secret: config.graph.client_secret.clone(),
				redirect_url: config.graph.redirect_url.clone(),
				login_hint: config.graph.login_hint.clone(),
			},
		);

		let scheduler = JobScheduler::new();
		let manager = TokenManager::new(
			Arc::new(oauth),
			Arc::new(FileTokenStore::new(&config.paths.token_file)),
			Arc::clone(&tokens),
			scheduler.clone(),
			Arc::clone(&notifier),
			config.lifecycle.refresh_margin(),
		);

		let chat: Arc<dyn ChatSender> = Arc::new(GraphChatSender::new(graph.clone(), Arc::clone(&tokens)));
		let plugins = PluginFactory::with_builtins().build(
			&plugin_definitions(&config.plugins),
			&PluginContext {
				chat: Some(Arc::clone(&chat)),
			},
		)?;
		let tasks = plugin_tasks(&config.tasks, &plugins)?;

		let resources = notification_resources(
			config.teams.user_id.as_deref().unwrap_or_default(),
			config.teams.subscribe_all,
			&config.teams.approved_chat_ids,
		);
		let subscriptions = Arc::new(SubscriptionManager::new(
			graph,
			tokens,
			resources,
			SubscriptionSettings {
				notification_url: config.graph.notification_url.clone(),
				encryption_certificate: certificate_body(&certificate),
				encryption_certificate_id: config.graph.encryption_certificate_id.clone(),
				lifetime: config.lifecycle.subscription_lifetime(),
			},
		));

		let state = AppState {
			port: config.http.port,
			key_pair,
			teams: Arc::new(config.teams.clone()),
			plugins: Arc::new(plugins),
			tokens: manager,
			scheduler,
			chat,
			notifier,
			router,
		};

		Ok(Self {
			state,
			subscriptions,
			tasks,
			sweep_interval: config.lifecycle.sweep_interval(),
		})
	}

	/// Restore the stored token, or ask for consent, then start the sweep and
	/// the configured plugin tasks.
	///
	/// With a restored token the first sweep runs immediately. Without one it
	/// waits for the authorization callback, which triggers it. The returned
	/// handle is the sweep's; task handles stop with the scheduler.
	pub async fn start(&self) -> Result<TaskHandle, LifecycleError> {
		let restored = self.state.tokens.restore().await?;
		if !restored {
			self.state.tokens.begin_authorization()?;
		}

		for (job, schedule) in &self.tasks {
			let job: Arc<dyn Job> = job.clone();
			self.state.scheduler.schedule_cron(job, schedule.clone());
		}

		let job = Arc::new(SubscriptionSweepJob::new(
			Arc::clone(&self.subscriptions),
			Arc::clone(&self.state.notifier),
		));
		let initial_delay = if restored { Duration::ZERO } else { self.sweep_interval };
		Ok(self
			.state
			.scheduler
			.schedule_repeating(job, initial_delay, self.sweep_interval))
	}

	pub async fn shutdown(&self) {
		self.state.scheduler.shutdown().await;
	}
}
