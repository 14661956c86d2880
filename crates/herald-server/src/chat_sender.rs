// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use herald_graph::{GraphClient, TokenCell};
use herald_plugin::{ChatSender, PluginError};
use tracing::debug;

/// Posts chat messages through Graph with the current bearer token.
pub struct GraphChatSender {
	graph: GraphClient,
	tokens: Arc<TokenCell>,
}

impl GraphChatSender {
	pub fn new(graph: GraphClient, tokens: Arc<TokenCell>) -> Self {
		Self { graph, tokens }
	}
}

#[async_trait]
impl ChatSender for GraphChatSender {
	async fn send_chat(&self, chat_id: &str, html: &str) -> herald_plugin::Result<()> {
		let token = self
			.tokens
			.bearer()
			.map_err(|e| PluginError::Delivery(e.to_string()))?;
		let id = self
			.graph
			.send_chat_message(&token, chat_id, html)
			.await
			.map_err(|e| PluginError::Delivery(e.to_string()))?;
		debug!(chat_id = %chat_id, message_id = %id, "Sent chat message");
		Ok(())
	}
}
