// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Which chats the bot listens to.

use serde::Deserialize;

use crate::error::ConfigError;

fn default_chatbot_name() -> String {
	"Herald".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamsConfigLayer {
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub subscribe_all: Option<bool>,
	#[serde(default)]
	pub approved_chat_ids: Option<Vec<String>>,
	#[serde(default)]
	pub chatbot_name: Option<String>,
}

impl TeamsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.user_id.is_some() {
			self.user_id = other.user_id;
		}
		if other.subscribe_all.is_some() {
			self.subscribe_all = other.subscribe_all;
		}
		if other.approved_chat_ids.is_some() {
			self.approved_chat_ids = other.approved_chat_ids;
		}
		if other.chatbot_name.is_some() {
			self.chatbot_name = other.chatbot_name;
		}
	}

	pub fn finalize(self) -> Result<TeamsConfig, ConfigError> {
		let subscribe_all = self.subscribe_all.unwrap_or(false);
		let user_id = self.user_id.filter(|s| !s.is_empty());
		if subscribe_all && user_id.is_none() {
			return Err(ConfigError::validation(
				"teams.user_id is required when teams.subscribe_all is set",
			));
		}

		Ok(TeamsConfig {
			user_id,
			subscribe_all,
			approved_chat_ids: self.approved_chat_ids.unwrap_or_default(),
			chatbot_name: self.chatbot_name.unwrap_or_else(default_chatbot_name),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamsConfig {
	/// The bot's own account; required for `subscribe_all`.
	pub user_id: Option<String>,
	pub subscribe_all: bool,
	/// Chats the bot answers in. Messages from any other chat are refused.
	pub approved_chat_ids: Vec<String>,
	/// Display name the bot posts under, used to ignore its own messages.
	pub chatbot_name: String,
}

impl TeamsConfig {
	pub fn is_approved(&self, chat_id: &str) -> bool {
		self.approved_chat_ids.iter().any(|id| id == chat_id)
	}
}

impl Default for TeamsConfig {
	fn default() -> Self {
		Self {
			user_id: None,
			subscribe_all: false,
			approved_chat_ids: Vec::new(),
			chatbot_name: default_chatbot_name(),
		}
	}
}
