// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Microsoft Graph integration for Herald.
//!
//! - [`GraphClient`]: subscriptions and chat messages over REST.
//! - [`OAuthClient`]: authorization-code and refresh-token grants.
//! - [`TokenManager`]: owns the bearer token and its refresh timer.
//! - [`SubscriptionManager`] / [`SubscriptionSweepJob`]: subscription upkeep.
//!
//! The token manager is the only writer of the [`TokenCell`]; every outbound
//! call site reads from it.

pub mod client;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod notifier;
pub mod oauth;
pub mod subscriptions;
pub mod token;
pub mod types;

pub use client::{GraphClient, DEFAULT_GRAPH_URL};
pub use error::{GraphError, LifecycleError, Result};
pub use lifecycle::{LifecycleState, TokenManager, TokenRefreshJob, DEFAULT_REFRESH_MARGIN, TOKEN_REFRESH_JOB_ID};
pub use notifier::{GraphChatNotifier, LogNotifier, OperatorNotifier};
pub use oauth::{OAuthClient, OAuthConfig, TokenEndpoint, DEFAULT_LOGIN_URL, SCOPES};
pub use subscriptions::{
	notification_resources, SubscriptionManager, SubscriptionSettings, SubscriptionSweepJob,
	SweepReport, DEFAULT_SUBSCRIPTION_LIFETIME, DEFAULT_SWEEP_INTERVAL, SUBSCRIPTION_SWEEP_JOB_ID,
};
pub use token::{BearerToken, FileTokenStore, MemoryTokenStore, TokenCell, TokenStore};
pub use types::{expiration_from_now, NewSubscription, Subscription};
