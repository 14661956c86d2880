// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer token lifecycle.
//!
//! ```text
//! Unauthenticated -> AuthorizationRequested -> TokenAcquired -> RefreshScheduled
//!                                                   ^                 |
//!                                                   |                 v
//!                                                   +---- RefreshInFlight -> RefreshFailed
//!                                                                                 |
//!                                            AuthorizationRequested <-------------+
//! ```
//!
//! Every acquired token schedules exactly one refresh, `refresh_margin` before
//! it expires. A failed refresh is terminal for that token: nothing retries.
//! The manager goes straight back to `AuthorizationRequested` and the operator
//! alert carries the consent URL, so the next callback starts a new token.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use herald_server_jobs::{Job, JobContext, JobError, JobOutput, JobScheduler, TaskHandle};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::error::{GraphError, LifecycleError};
use crate::notifier::OperatorNotifier;
use crate::oauth::TokenEndpoint;
use crate::token::{BearerToken, TokenCell, TokenStore};

pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
	Unauthenticated,
	AuthorizationRequested,
	TokenAcquired,
	RefreshScheduled,
	RefreshInFlight,
	RefreshFailed,
}

struct Inner {
	state: LifecycleState,
	refresh_task: Option<TaskHandle>,
}

pub struct TokenManager {
	me: Weak<TokenManager>,
	endpoint: Arc<dyn TokenEndpoint>,
	store: Arc<dyn TokenStore>,
	tokens: Arc<TokenCell>,
	scheduler: JobScheduler,
	notifier: Arc<dyn OperatorNotifier>,
	refresh_margin: Duration,
	inner: Mutex<Inner>,
}

impl TokenManager {
	pub fn new(
		endpoint: Arc<dyn TokenEndpoint>,
		store: Arc<dyn TokenStore>,
		tokens: Arc<TokenCell>,
		scheduler: JobScheduler,
		notifier: Arc<dyn OperatorNotifier>,
		refresh_margin: Duration,
	) -> Arc<Self> {
		Arc::new_cyclic(|me| Self {
			me: me.clone(),
			endpoint,
			store,
			tokens,
			scheduler,
			notifier,
			refresh_margin,
			inner: Mutex::new(Inner {
				state: LifecycleState::Unauthenticated,
				refresh_task: None,
			}),
		})
	}

	pub fn state(&self) -> LifecycleState {
		self.lock().state
	}

	/// Shared read side of the current token, for outbound call sites.
	pub fn tokens(&self) -> Arc<TokenCell> {
		Arc::clone(&self.tokens)
	}

	pub fn refresh_task(&self) -> Option<TaskHandle> {
		self.lock().refresh_task.clone()
	}

	/// Produce the consent URL and wait for its callback.
	pub fn begin_authorization(&self) -> Result<Url, LifecycleError> {
		let url = self.endpoint.authorization_url()?;
		self.set_state(LifecycleState::AuthorizationRequested);
		info!(url = %url, "Authorization requested; open the consent URL to continue");
		Ok(url)
	}

	/// Redeem the code delivered to the callback and start the refresh timer.
	///
	/// On failure the previous state and token are kept and the operator is
	/// notified.
	#[instrument(skip_all)]
	pub async fn complete_authorization(&self, code: &str) -> Result<(), LifecycleError> {
		let code = code.trim();
		if code.is_empty() {
			return Err(LifecycleError::MissingCode);
		}

		match self.endpoint.redeem_code(code).await {
			Ok(token) => {
				let delay = Duration::from_secs(token.expires_in).saturating_sub(self.refresh_margin);
				self.accept(token, delay).await;
				Ok(())
			}
			Err(e) => {
				error!(error = %e, "Authorization code redemption failed");
				self.notifier
					.notify(&format!("Graph authorization failed: {e}"))
					.await;
				Err(e.into())
			}
		}
	}

	/// Load a persisted token after a restart and schedule its refresh.
	/// Returns whether a token was found.
	#[instrument(skip_all)]
	pub async fn restore(&self) -> Result<bool, LifecycleError> {
		let Some(token) = self.store.load().await? else {
			info!("No stored bearer token; authorization required");
			self.set_state(LifecycleState::Unauthenticated);
			return Ok(false);
		};

		let delay = token.refresh_delay(self.refresh_margin, Utc::now());
		info!(refresh_in_secs = delay.as_secs(), "Restored bearer token");
		self.tokens.set(token.clone());
		self.set_state(LifecycleState::TokenAcquired);
		self.schedule_refresh(delay);
		Ok(true)
	}

	/// Exchange the refresh token for a new bearer token.
	#[instrument(skip_all)]
	pub async fn refresh_now(&self) -> Result<(), LifecycleError> {
		let Some(current) = self.tokens.get() else {
			return Err(GraphError::NotAuthenticated.into());
		};
		self.set_state(LifecycleState::RefreshInFlight);

		match self.endpoint.refresh(&current.refresh_token).await {
			Ok(token) => {
				let delay = Duration::from_secs(token.expires_in).saturating_sub(self.refresh_margin);
				self.accept(token, delay).await;
				Ok(())
			}
			Err(e) => {
				{
					let mut inner = self.lock();
					inner.state = LifecycleState::RefreshFailed;
					inner.refresh_task = None;
				}
				error!(error = %e, "Graph token refresh failed; re-authorization required");
				let message = match self.begin_authorization() {
					Ok(url) => format!(
						"Graph token refresh failed: {e}. Re-authorize Herald to resume: {url}"
					),
					Err(url_error) => {
						warn!(error = %url_error, "Could not build the consent URL");
						format!("Graph token refresh failed: {e}. Re-authorize Herald to resume.")
					}
				};
				self.notifier.notify(&message).await;
				Err(LifecycleError::RefreshFailed(e.to_string()))
			}
		}
	}

	async fn accept(&self, token: BearerToken, refresh_in: Duration) {
		if let Err(e) = self.store.save(&token).await {
			warn!(error = %e, "Failed to persist bearer token; continuing with in-memory token");
			self.notifier
				.notify(&format!("Failed to persist Graph token: {e}"))
				.await;
		}
		self.tokens.set(token);
		self.set_state(LifecycleState::TokenAcquired);
		self.schedule_refresh(refresh_in);
	}

	fn schedule_refresh(&self, delay: Duration) {
		let job = Arc::new(TokenRefreshJob {
			manager: self.me.clone(),
		});
		let handle = self.scheduler.schedule_once(job, delay);

		let mut inner = self.lock();
		if let Some(previous) = inner.refresh_task.replace(handle) {
			previous.cancel();
		}
		inner.state = LifecycleState::RefreshScheduled;
		info!(delay_secs = delay.as_secs(), "Scheduled token refresh");
	}

	fn set_state(&self, state: LifecycleState) {
		self.lock().state = state;
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

pub const TOKEN_REFRESH_JOB_ID: &str = "graph-token-refresh";

/// One-shot job that refreshes the bearer token.
pub struct TokenRefreshJob {
	manager: Weak<TokenManager>,
}

#[async_trait]
impl Job for TokenRefreshJob {
	fn id(&self) -> &str {
		TOKEN_REFRESH_JOB_ID
	}

	fn name(&self) -> &str {
		"Graph Token Refresh"
	}

	fn description(&self) -> &str {
		"Exchanges the refresh token before the bearer token expires"
	}

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}
		let Some(manager) = self.manager.upgrade() else {
			return Err(JobError::Cancelled);
		};
		manager
			.refresh_now()
			.await
			.map(|()| JobOutput::message("Bearer token refreshed"))
			.map_err(|e| JobError::failed(e.to_string()))
	}
}
