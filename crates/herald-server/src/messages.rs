// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decrypted chat messages and the checks applied before routing them.

use herald_server_config::TeamsConfig;
use serde::Deserialize;

/// The `chatMessage` resource carried in a rich notification.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub chat_id: String,
	#[serde(default)]
	pub from: Option<MessageFrom>,
	#[serde(default)]
	pub body: MessageBody,
	#[serde(default)]
	pub created_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFrom {
	#[serde(default)]
	pub user: Option<MessageUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUser {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub display_name: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
	#[serde(default)]
	pub content_type: Option<String>,
	#[serde(default)]
	pub content: String,
}

impl ChatMessage {
	/// Display name of the sending user. Graph omits it for system events.
	pub fn sender_name(&self) -> Option<&str> {
		self.from
			.as_ref()
			.and_then(|from| from.user.as_ref())
			.and_then(|user| user.display_name.as_deref())
			.filter(|name| !name.is_empty())
	}

	/// Message text with the paragraph markup Teams wraps it in removed.
	pub fn text(&self) -> String {
		self.body
			.content
			.replace("<p>", "")
			.replace("</p>", "")
			.trim()
			.to_string()
	}
}

// Message content is never rendered into logs.
impl std::fmt::Debug for ChatMessage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChatMessage")
			.field("id", &self.id)
			.field("chat_id", &self.chat_id)
			.field("sender", &self.sender_name())
			.field("content_len", &self.body.content.len())
			.finish()
	}
}

/// What to do with a decrypted message.
#[derive(Debug)]
pub enum Disposition {
	/// No sender display name, or no chat id.
	Anonymous,
	/// Sent by the bot itself.
	OwnMessage,
	/// From a chat outside the approved list.
	Unapproved { sender: String, chat_id: String },
	Approved(ChatMessage),
}

pub fn classify(teams: &TeamsConfig, message: ChatMessage) -> Disposition {
	let Some(sender) = message.sender_name() else {
		return Disposition::Anonymous;
	};
	if message.chat_id.is_empty() {
		return Disposition::Anonymous;
	}
	if sender == teams.chatbot_name {
		return Disposition::OwnMessage;
	}
	if !teams.is_approved(&message.chat_id) {
		return Disposition::Unapproved {
			sender: sender.to_string(),
			chat_id: message.chat_id.clone(),
		};
	}
	Disposition::Approved(message)
}
