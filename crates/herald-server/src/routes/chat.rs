// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph change notifications for subscribed chats.

use axum::{
	body::Bytes,
	extract::{Query, State},
	http::{header, StatusCode},
	response::{IntoResponse, Response},
};
use herald_graph_crypto::{open, ChangeNotification, ChangeNotificationCollection};
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};

use crate::api::AppState;
use crate::messages::{classify, ChatMessage, Disposition};

pub const REFUSAL_MESSAGE: &str =
	"Sorry, I can't chat to you right now. You need to be authorized. An admin has been notified.";

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
	#[serde(rename = "validationToken", default)]
	pub validation_token: Option<String>,
}

/// POST /chat - subscription validation handshake or a notification batch.
///
/// Notifications are always acknowledged with 202, whatever happened to them,
/// so a sender learns nothing about why one was discarded.
#[instrument(skip_all)]
pub async fn change_notification(
	State(state): State<AppState>,
	Query(query): Query<NotificationQuery>,
	body: Bytes,
) -> Response {
	if let Some(token) = query.validation_token {
		debug!("Answering subscription validation request");
		return (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], token).into_response();
	}

	match serde_json::from_slice::<ChangeNotificationCollection>(&body) {
		Ok(collection) => {
			trace!(count = collection.value.len(), "Change notification batch");
			for notification in collection.value {
				handle_notification(&state, notification).await;
			}
		}
		Err(e) => warn!(error = %e, "Malformed change notification body"),
	}

	(StatusCode::ACCEPTED, "received").into_response()
}

async fn handle_notification(state: &AppState, notification: ChangeNotification) {
	let Some(envelope) = notification.encrypted_content else {
		debug!(
			subscription_id = notification.subscription_id.as_deref().unwrap_or_default(),
			"Notification has no encrypted content"
		);
		return;
	};

	let message: ChatMessage = match open(&state.key_pair, &envelope) {
		Ok(message) => message,
		Err(e) => {
			warn!(
				error = %e,
				subscription_id = notification.subscription_id.as_deref().unwrap_or_default(),
				"Discarding notification"
			);
			return;
		}
	};

	match classify(&state.teams, message) {
		Disposition::Anonymous => debug!("Ignoring message without a sender"),
		Disposition::OwnMessage => trace!("Ignoring own message"),
		Disposition::Unapproved { sender, chat_id } => {
			warn!(sender = %sender, chat_id = %chat_id, "Message from unapproved chat");
			state
				.notifier
				.notify(&format!(
					"User {sender} tried to chat, but is not authorized. Chat ID: {chat_id}"
				))
				.await;
			if let Err(e) = state.chat.send_chat(&chat_id, REFUSAL_MESSAGE).await {
				warn!(chat_id = %chat_id, error = %e, "Failed to send refusal");
			}
		}
		Disposition::Approved(message) => state.router.route(message).await,
	}
}
