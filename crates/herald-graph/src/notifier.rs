// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator alerts for lifecycle failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::client::GraphClient;
use crate::token::TokenCell;

/// Channel for failures an operator must act on. Delivery is best effort and
/// never fails the caller.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
	async fn notify(&self, message: &str);
}

/// Writes alerts to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl OperatorNotifier for LogNotifier {
	async fn notify(&self, message: &str) {
		error!(alert = %message, "operator alert");
	}
}

/// Posts alerts to the admin chat, and logs them.
///
/// Uses whatever token is current, so an alert about a failed refresh still
/// goes out while the old token has not yet expired.
pub struct GraphChatNotifier {
	graph: GraphClient,
	tokens: Arc<TokenCell>,
	chat_id: String,
}

impl GraphChatNotifier {
	pub fn new(graph: GraphClient, tokens: Arc<TokenCell>, chat_id: impl Into<String>) -> Self {
		Self {
			graph,
			tokens,
			chat_id: chat_id.into(),
		}
	}
}

#[async_trait]
impl OperatorNotifier for GraphChatNotifier {
	async fn notify(&self, message: &str) {
		error!(alert = %message, chat_id = %self.chat_id, "operator alert");

		let token = match self.tokens.bearer() {
			Ok(token) => token,
			Err(e) => {
				warn!(error = %e, "cannot deliver operator alert to chat");
				return;
			}
		};
		let html = format!("<b>Herald alert</b><br>{}", escape_html(message));
		if let Err(e) = self.graph.send_chat_message(&token, &self.chat_id, &html).await {
			warn!(error = %e, "failed to deliver operator alert to chat");
		}
	}
}

pub(crate) fn escape_html(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			_ => out.push(c),
		}
	}
	out
}
