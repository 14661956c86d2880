// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use herald_common_secret::SecretString;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{api_error, GraphError, Result};
use crate::types::{
	ChatMessageRequest, ItemBody, NewSubscription, RenewSubscription, SentMessage, Subscription,
	SubscriptionPage,
};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0/";

/// REST client for the Graph endpoints Herald uses. Every call takes the bearer
/// token explicitly; this type holds no credentials.
#[derive(Debug, Clone)]
pub struct GraphClient {
	http: Client,
	base_url: Url,
}

impl GraphClient {
	pub fn new(base_url: &str) -> Result<Self> {
		Self::with_http(crate::http::new_client()?, base_url)
	}

	pub fn with_http(http: Client, base_url: &str) -> Result<Self> {
		let mut base_url = Url::parse(base_url)?;
		if base_url.cannot_be_a_base() {
			return Err(GraphError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}
		Ok(Self { http, base_url })
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	/// All active subscriptions owned by the app, following `@odata.nextLink`.
	#[instrument(skip(self, token))]
	pub async fn list_subscriptions(&self, token: &SecretString) -> Result<Vec<Subscription>> {
		let mut url = self.endpoint(&["subscriptions"]);
		let mut subscriptions = Vec::new();
		loop {
			let response = self.http.get(url).bearer_auth(token.expose()).send().await?;
			let page: SubscriptionPage = parse(response).await?;
			subscriptions.extend(page.value);
			match page.next_link {
				Some(next) => url = Url::parse(&next)?,
				None => break,
			}
		}
		debug!(count = subscriptions.len(), "listed subscriptions");
		Ok(subscriptions)
	}

	#[instrument(skip(self, token, request), fields(resource = %request.resource))]
	pub async fn create_subscription(
		&self,
		token: &SecretString,
		request: &NewSubscription,
	) -> Result<Subscription> {
		let response = self
			.http
			.post(self.endpoint(&["subscriptions"]))
			.bearer_auth(token.expose())
			.json(request)
			.send()
			.await?;
		parse(response).await
	}

	/// Move a subscription's expiration to `expiration`.
	#[instrument(skip(self, token))]
	pub async fn renew_subscription(
		&self,
		token: &SecretString,
		subscription_id: &str,
		expiration: &str,
	) -> Result<Subscription> {
		let response = self
			.http
			.patch(self.endpoint(&["subscriptions", subscription_id]))
			.bearer_auth(token.expose())
			.json(&RenewSubscription {
				expiration_date_time: expiration,
			})
			.send()
			.await?;
		parse(response).await
	}

	/// Post an HTML message to a chat. Returns the new message id.
	#[instrument(skip(self, token, html))]
	pub async fn send_chat_message(
		&self,
		token: &SecretString,
		chat_id: &str,
		html: &str,
	) -> Result<String> {
		let response = self
			.http
			.post(self.endpoint(&["chats", chat_id, "messages"]))
			.bearer_auth(token.expose())
			.json(&ChatMessageRequest {
				body: ItemBody {
					content_type: "html",
					content: html,
				},
			})
			.send()
			.await?;
		let sent: SentMessage = parse(response).await?;
		Ok(sent.id)
	}
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
	if !response.status().is_success() {
		return Err(api_error(response).await);
	}
	response
		.json::<T>()
		.await
		.map_err(|e| GraphError::invalid_response(e.to_string()))
}
