// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keeps one live change-notification subscription per resource.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herald_server_jobs::{Job, JobContext, JobError, JobOutput};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::client::GraphClient;
use crate::error::Result;
use crate::notifier::OperatorNotifier;
use crate::token::TokenCell;
use crate::types::{expiration_from_now, NewSubscription, Subscription};

pub const DEFAULT_SUBSCRIPTION_LIFETIME: Duration = Duration::from_secs(3600);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3300);

/// Resources to subscribe to: every chat of `user_id`, or each approved chat.
pub fn notification_resources(
	user_id: &str,
	subscribe_all: bool,
	approved_chat_ids: &[String],
) -> Vec<String> {
	if subscribe_all {
		vec![format!("/users/{user_id}/chats/getAllMessages")]
	} else {
		approved_chat_ids
			.iter()
			.map(|chat| format!("/chats/{chat}/messages"))
			.collect()
	}
}

/// What a new subscription is bound to.
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
	pub notification_url: String,
	/// Base64 DER certificate body Graph encrypts resource data to.
	pub encryption_certificate: String,
	pub encryption_certificate_id: String,
	pub lifetime: Duration,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
	pub created: Vec<String>,
	pub renewed: Vec<String>,
	/// `(resource, error)` pairs.
	pub failed: Vec<(String, String)>,
}

impl SweepReport {
	pub fn is_clean(&self) -> bool {
		self.failed.is_empty()
	}
}

pub struct SubscriptionManager {
	graph: GraphClient,
	tokens: Arc<TokenCell>,
	resources: Vec<String>,
	settings: SubscriptionSettings,
	/// Held for a whole sweep so a triggered sweep and a scheduled one never
	/// list and create concurrently.
	sweeping: Mutex<()>,
}

impl SubscriptionManager {
	pub fn new(
		graph: GraphClient,
		tokens: Arc<TokenCell>,
		resources: Vec<String>,
		settings: SubscriptionSettings,
	) -> Self {
		Self {
			graph,
			tokens,
			resources,
			settings,
			sweeping: Mutex::new(()),
		}
	}

	pub fn resources(&self) -> &[String] {
		&self.resources
	}

	/// Renew the subscription for each resource, creating it where none
	/// exists. State comes from Graph's subscription list, never from memory,
	/// so the first sweep after a restart adopts what is already there.
	#[instrument(skip(self), fields(resources = self.resources.len()))]
	pub async fn sweep(&self) -> Result<SweepReport> {
		let _sweeping = self.sweeping.lock().await;
		let token = self.tokens.bearer()?;
		let existing = self.graph.list_subscriptions(&token).await?;
		let mut report = SweepReport::default();

		for resource in &self.resources {
			let matching: Vec<&Subscription> = existing.iter().filter(|s| s.covers(resource)).collect();
			if matching.len() > 1 {
				warn!(resource = %resource, count = matching.len(), "Multiple subscriptions for resource; renewing the first");
			}

			let expiration = expiration_from_now(self.settings.lifetime);
			let outcome = match matching.first() {
				Some(sub) => self
					.graph
					.renew_subscription(&token, &sub.id, &expiration)
					.await
					.map(|renewed| {
						info!(resource = %resource, id = %renewed.id, expires = %renewed.expiration_date_time, "Renewed subscription");
						report.renewed.push(resource.clone());
					}),
				None => self
					.graph
					.create_subscription(&token, &self.new_subscription(resource, expiration))
					.await
					.map(|created| {
						info!(resource = %resource, id = %created.id, expires = %created.expiration_date_time, "Created subscription");
						report.created.push(resource.clone());
					}),
			};

			if let Err(e) = outcome {
				warn!(resource = %resource, error = %e, "Subscription upkeep failed");
				report.failed.push((resource.clone(), e.to_string()));
			}
		}

		Ok(report)
	}

	fn new_subscription(&self, resource: &str, expiration: String) -> NewSubscription {
		NewSubscription {
			resource: resource.to_string(),
			notification_url: self.settings.notification_url.clone(),
			change_type: "created".to_string(),
			expiration_date_time: expiration,
			encryption_certificate: self.settings.encryption_certificate.clone(),
			encryption_certificate_id: self.settings.encryption_certificate_id.clone(),
			include_resource_data: true,
		}
	}
}

pub const SUBSCRIPTION_SWEEP_JOB_ID: &str = "graph-subscription-sweep";

/// Repeating job around [`SubscriptionManager::sweep`]. Failures are alerted
/// and left for the next run.
pub struct SubscriptionSweepJob {
	manager: Arc<SubscriptionManager>,
	notifier: Arc<dyn OperatorNotifier>,
}

impl SubscriptionSweepJob {
	pub fn new(manager: Arc<SubscriptionManager>, notifier: Arc<dyn OperatorNotifier>) -> Self {
		Self { manager, notifier }
	}
}

#[async_trait]
impl Job for SubscriptionSweepJob {
	fn id(&self) -> &str {
		SUBSCRIPTION_SWEEP_JOB_ID
	}

	fn name(&self) -> &str {
		"Graph Subscription Sweep"
	}

	fn description(&self) -> &str {
		"Renews or creates the change-notification subscription for each chat resource"
	}

	async fn run(&self, _ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
		match self.manager.sweep().await {
			Ok(report) if report.is_clean() => Ok(JobOutput {
				message: format!(
					"Created {} and renewed {} subscriptions",
					report.created.len(),
					report.renewed.len()
				),
				metadata: serde_json::to_value(&report).ok(),
			}),
			Ok(report) => {
				let failures: Vec<String> = report
					.failed
					.iter()
					.map(|(resource, error)| format!("{resource}: {error}"))
					.collect();
				let message = format!("Subscription sweep failed for {}", failures.join("; "));
				self.notifier.notify(&message).await;
				Err(JobError::transient(message))
			}
			Err(e) => {
				let message = format!("Subscription sweep failed: {e}");
				self.notifier.notify(&message).await;
				Err(JobError::transient(message))
			}
		}
	}
}
