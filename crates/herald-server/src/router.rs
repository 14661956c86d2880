// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use tracing::info;

use crate::messages::ChatMessage;

/// Receives messages from approved chats.
#[async_trait]
pub trait MessageRouter: Send + Sync {
	async fn route(&self, message: ChatMessage);
}

/// Records that a message arrived, without its content.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRouter;

#[async_trait]
impl MessageRouter for LoggingRouter {
	async fn route(&self, message: ChatMessage) {
		info!(
			chat_id = %message.chat_id,
			sender = message.sender_name().unwrap_or_default(),
			length = message.body.content.len(),
			"Chat message received"
		);
	}
}
