// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Herald HTTP server.
//!
//! Receives encrypted Graph change notifications for Teams chats and
//! third-party webhooks, and keeps the Graph token and subscriptions alive in
//! the background, along with any plugin tasks configured on a cron
//! schedule.

pub mod api;
pub mod chat_sender;
pub mod error;
pub mod messages;
pub mod router;
pub mod routes;
pub mod startup;
pub mod tasks;
pub mod vault_cli;

pub use api::{create_router, AppState};
pub use chat_sender::GraphChatSender;
pub use error::ServerError;
pub use messages::{classify, ChatMessage, Disposition};
pub use router::{LoggingRouter, MessageRouter};
pub use startup::{plugin_definitions, Herald};
pub use tasks::{plugin_tasks, PluginTaskJob};
