// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Drives the router end to end with in-memory collaborators.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
	body::Body,
	http::{header, Request, StatusCode},
	Router,
};
use chrono::Utc;
use herald_common_secret::SecretString;
use herald_graph::{
	BearerToken, GraphError, LifecycleState, MemoryTokenStore, OperatorNotifier, TokenCell,
	TokenEndpoint, TokenManager,
};
use herald_graph_crypto::{seal, KeyPair};
use herald_plugin::{
	AuthMode, AuthPolicy, ChatSender, Plugin, PluginRegistration, PluginRegistry,
};
use herald_server::{create_router, AppState, ChatMessage, MessageRouter};
use herald_server_config::TeamsConfig;
use herald_server_jobs::JobScheduler;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

const TEST_KEY: &str = include_str!("../../herald-graph-crypto/testdata/graph_test_key.pem");
const OTHER_KEY: &str = include_str!("../../herald-graph-crypto/testdata/other_test_key.pem");
const MIST_SECRET: &str = "mist-webhook-secret";

fn token() -> BearerToken {
	BearerToken {
		access_token: SecretString::from("access"),
		refresh_token: SecretString::from("refresh"),
		expires_in: 3600,
		acquired_at: Utc::now(),
	}
}

struct FakeEndpoint;

#[async_trait]
impl TokenEndpoint for FakeEndpoint {
	fn authorization_url(&self) -> herald_graph::Result<Url> {
		Ok(Url::parse("https://login.example.com/authorize").unwrap())
	}

	async fn redeem_code(&self, code: &str) -> herald_graph::Result<BearerToken> {
		if code == "rejected" {
			return Err(GraphError::TokenRejected("invalid_grant".to_string()));
		}
		Ok(token())
	}

	async fn refresh(&self, _: &SecretString) -> herald_graph::Result<BearerToken> {
		Ok(token())
	}
}

#[derive(Default)]
struct Recorder {
	alerts: Mutex<Vec<String>>,
	sent: Mutex<Vec<(String, String)>>,
	routed: Mutex<Vec<ChatMessage>>,
	events: Mutex<Vec<(Value, Option<IpAddr>)>>,
}

struct Alerts(Arc<Recorder>);
struct Chat(Arc<Recorder>);
struct Routed(Arc<Recorder>);
struct Events(Arc<Recorder>);

#[async_trait]
impl OperatorNotifier for Alerts {
	async fn notify(&self, message: &str) {
		self.0.alerts.lock().unwrap().push(message.to_string());
	}
}

#[async_trait]
impl ChatSender for Chat {
	async fn send_chat(&self, chat_id: &str, html: &str) -> herald_plugin::Result<()> {
		self.0
			.sent
			.lock()
			.unwrap()
			.push((chat_id.to_string(), html.to_string()));
		Ok(())
	}
}

#[async_trait]
impl MessageRouter for Routed {
	async fn route(&self, message: ChatMessage) {
		self.0.routed.lock().unwrap().push(message);
	}
}

#[async_trait]
impl Plugin for Events {
	fn kind(&self) -> &'static str {
		"recording"
	}

	async fn handle_event(&self, event: Value, source: Option<IpAddr>) -> herald_plugin::Result<()> {
		self.0.events.lock().unwrap().push((event, source));
		Ok(())
	}
}

struct TestApp {
	app: Router,
	recorder: Arc<Recorder>,
	key_pair: KeyPair,
	tokens: Arc<TokenManager>,
}

fn test_app() -> TestApp {
	let recorder = Arc::new(Recorder::default());
	let key_pair = KeyPair::from_pem(TEST_KEY).unwrap();
	let scheduler = JobScheduler::new();
	let notifier: Arc<dyn OperatorNotifier> = Arc::new(Alerts(Arc::clone(&recorder)));

	let tokens = TokenManager::new(
		Arc::new(FakeEndpoint),
		Arc::new(MemoryTokenStore::new()),
		Arc::new(TokenCell::new()),
		scheduler.clone(),
		Arc::clone(&notifier),
		std::time::Duration::from_secs(300),
	);

	let handler: Arc<dyn Plugin> = Arc::new(Events(Arc::clone(&recorder)));
	let plugins = PluginRegistry::new(vec![PluginRegistration {
		name: "mist".to_string(),
		route: "mist".to_string(),
		policy: AuthPolicy::new(
			AuthMode::Hmac,
			"X-Mist-Signature-v2",
			SecretString::from(MIST_SECRET),
		),
		handler,
	}])
	.unwrap();

	let state = AppState {
		port: 8080,
		key_pair: Arc::new(key_pair.clone()),
		teams: Arc::new(TeamsConfig {
			approved_chat_ids: vec!["19:approved@thread.v2".to_string()],
			chatbot_name: "Herald".to_string(),
			..Default::default()
		}),
		plugins: Arc::new(plugins),
		tokens: Arc::clone(&tokens),
		scheduler,
		chat: Arc::new(Chat(Arc::clone(&recorder))),
		notifier,
		router: Arc::new(Routed(Arc::clone(&recorder))),
	};

	TestApp {
		app: create_router(state),
		recorder,
		key_pair,
		tokens,
	}
}

fn chat_message(sender: &str, chat_id: &str) -> Vec<u8> {
	serde_json::to_vec(&json!({
		"id": "1700000000000",
		"chatId": chat_id,
		"from": { "user": { "id": "u-1", "displayName": sender } },
		"body": { "contentType": "html", "content": "<p>status</p>" },
	}))
	.unwrap()
}

fn notification_body(key_pair: &KeyPair, payloads: &[Vec<u8>]) -> String {
	let value: Vec<Value> = payloads
		.iter()
		.map(|payload| {
			let envelope = seal(&key_pair.public_key(), payload, Some("herald")).unwrap();
			json!({
				"subscriptionId": "sub-1",
				"changeType": "created",
				"encryptedContent": envelope,
			})
		})
		.collect();
	json!({ "value": value }).to_string()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	(status, String::from_utf8(body.to_vec()).unwrap())
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(body.into())
		.unwrap()
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_liveness_reports_port() {
	let t = test_app();
	let (status, body) = send(&t.app, get("/test")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, "Herald is running on port 8080");
}

#[tokio::test]
async fn test_health_reports_lifecycle_and_jobs() {
	let t = test_app();
	let (status, body) = send(&t.app, get("/health")).await;
	assert_eq!(status, StatusCode::OK);
	let health: Value = serde_json::from_str(&body).unwrap();
	assert_eq!(health["status"], "degraded");
	assert_eq!(health["lifecycle"]["state"], "unauthenticated");
	assert_eq!(health["jobs"]["status"], "healthy");
	assert!(health["version"].is_string());

	send(&t.app, get("/callback?code=consent-code")).await;
	let (_, body) = send(&t.app, get("/health")).await;
	let health: Value = serde_json::from_str(&body).unwrap();
	assert_eq!(health["status"], "healthy");
	assert_eq!(health["lifecycle"]["state"], "refresh_scheduled");
	assert!(health["jobs"]["jobs"]
		.as_array()
		.unwrap()
		.iter()
		.any(|job| job["pending"] == true));
}

#[tokio::test]
async fn test_validation_token_is_echoed_as_plain_text() {
	let t = test_app();
	let response = t
		.app
		.clone()
		.oneshot(post("/chat?validationToken=Validation%3A%20abc123", Body::empty()))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
		"text/plain"
	);
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	assert_eq!(&body[..], b"Validation: abc123");
}

#[tokio::test]
async fn test_approved_message_reaches_router() {
	let t = test_app();
	let body = notification_body(&t.key_pair, &[chat_message("Alice", "19:approved@thread.v2")]);

	let (status, text) = send(&t.app, post("/chat", body)).await;

	assert_eq!(status, StatusCode::ACCEPTED);
	assert_eq!(text, "received");
	let routed = t.recorder.routed.lock().unwrap();
	assert_eq!(routed.len(), 1);
	assert_eq!(routed[0].chat_id, "19:approved@thread.v2");
	assert_eq!(routed[0].text(), "status");
	assert!(t.recorder.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_every_notification_in_a_batch_is_processed() {
	let t = test_app();
	let body = notification_body(
		&t.key_pair,
		&[
			chat_message("Alice", "19:approved@thread.v2"),
			chat_message("Bob", "19:approved@thread.v2"),
		],
	);

	send(&t.app, post("/chat", body)).await;

	assert_eq!(t.recorder.routed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_tampered_notification_is_acknowledged_but_dropped() {
	let t = test_app();
	let mut envelope = seal(
		&t.key_pair.public_key(),
		&chat_message("Alice", "19:approved@thread.v2"),
		None,
	)
	.unwrap();
	envelope.data_signature = herald_common_webhook::compute_hmac_sha256_base64(b"wrong", b"x");
	let body = json!({ "value": [{ "encryptedContent": envelope }] }).to_string();

	let (status, text) = send(&t.app, post("/chat", body)).await;

	assert_eq!(status, StatusCode::ACCEPTED);
	assert_eq!(text, "received");
	assert!(t.recorder.routed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_for_another_key_is_dropped() {
	let t = test_app();
	let other = KeyPair::from_pem(OTHER_KEY).unwrap();
	let body = notification_body(&other, &[chat_message("Alice", "19:approved@thread.v2")]);

	let (status, _) = send(&t.app, post("/chat", body)).await;

	assert_eq!(status, StatusCode::ACCEPTED);
	assert!(t.recorder.routed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_acknowledged() {
	let t = test_app();
	let (status, text) = send(&t.app, post("/chat", "{not json")).await;
	assert_eq!(status, StatusCode::ACCEPTED);
	assert_eq!(text, "received");
}

#[tokio::test]
async fn test_unapproved_chat_alerts_admin_and_refuses() {
	let t = test_app();
	let body = notification_body(&t.key_pair, &[chat_message("Mallory", "19:stranger@thread.v2")]);

	let (status, _) = send(&t.app, post("/chat", body)).await;

	assert_eq!(status, StatusCode::ACCEPTED);
	assert!(t.recorder.routed.lock().unwrap().is_empty());

	let alerts = t.recorder.alerts.lock().unwrap();
	assert_eq!(alerts.len(), 1);
	assert!(alerts[0].contains("Mallory"));
	assert!(alerts[0].contains("19:stranger@thread.v2"));

	let sent = t.recorder.sent.lock().unwrap();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].0, "19:stranger@thread.v2");
}

#[tokio::test]
async fn test_own_and_anonymous_messages_are_ignored() {
	let t = test_app();
	let anonymous = serde_json::to_vec(&json!({
		"chatId": "19:approved@thread.v2",
		"body": { "content": "system event" },
	}))
	.unwrap();
	let body = notification_body(
		&t.key_pair,
		&[chat_message("Herald", "19:stranger@thread.v2"), anonymous],
	);

	send(&t.app, post("/chat", body)).await;

	assert!(t.recorder.routed.lock().unwrap().is_empty());
	assert!(t.recorder.alerts.lock().unwrap().is_empty());
	assert!(t.recorder.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_webhook_route_is_invalid_path() {
	let t = test_app();
	let (status, body) = send(&t.app, post("/nothing-here", "{}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, "Invalid path");
}

#[tokio::test]
async fn test_signed_webhook_is_dispatched_with_forwarded_source() {
	let t = test_app();
	let payload = br#"{"topic":"alarms","events":[{"type":"device_down"}]}"#;
	let signature = herald_common_webhook::compute_hmac_sha256_hex(MIST_SECRET.as_bytes(), payload);

	let request = Request::builder()
		.method("POST")
		.uri("/mist")
		.header("X-Mist-Signature-v2", signature)
		.header("X-Forwarded-For", "198.51.100.4, 10.0.0.1")
		.body(Body::from(payload.to_vec()))
		.unwrap();
	let (status, body) = send(&t.app, request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, "Webhook received");
	let events = t.recorder.events.lock().unwrap();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].0["topic"], "alarms");
	assert_eq!(events[0].1, Some("198.51.100.4".parse().unwrap()));
}

#[tokio::test]
async fn test_unsigned_webhook_is_acknowledged_but_not_dispatched() {
	let t = test_app();

	let missing = post("/mist", r#"{"topic":"alarms"}"#);
	let (status, body) = send(&t.app, missing).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, "Webhook received");

	let forged = Request::builder()
		.method("POST")
		.uri("/mist")
		.header("X-Mist-Signature-v2", "00".repeat(32))
		.body(Body::from(r#"{"topic":"alarms"}"#))
		.unwrap();
	let (status, body) = send(&t.app, forged).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, "Webhook received");

	assert!(t.recorder.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
	let t = test_app();
	for uri in ["/callback", "/callback?code="] {
		let (status, _) = send(&t.app, get(uri)).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
	}
	assert_eq!(t.tokens.state(), LifecycleState::Unauthenticated);
}

#[tokio::test]
async fn test_callback_with_rejected_code_is_bad_gateway() {
	let t = test_app();
	let (status, _) = send(&t.app, get("/callback?code=rejected")).await;
	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(t.recorder.alerts.lock().unwrap().len(), 1);
	assert!(t.tokens.tokens().get().is_none());
}

#[tokio::test]
async fn test_callback_redeems_code_and_schedules_refresh() {
	let t = test_app();
	let (status, body) = send(&t.app, get("/callback?code=consent-code")).await;

	assert_eq!(status, StatusCode::OK);
	assert!(body.contains("Thank you"));
	assert_eq!(t.tokens.state(), LifecycleState::RefreshScheduled);
	assert!(t.tokens.refresh_task().is_some());
	assert_eq!(t.tokens.tokens().bearer().unwrap().expose(), "access");
}
