// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::types::TriggerSource;

pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
	pub cancellation_token: CancellationToken,
}

/// Shared cancel flag. Jobs poll [`CancellationToken::is_cancelled`]; timers
/// wait on [`CancellationToken::cancelled`] so a pending run wakes immediately.
#[derive(Clone)]
pub struct CancellationToken {
	inner: Arc<Inner>,
}

struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				cancelled: AtomicBool::new(false),
				notify: Notify::new(),
			}),
		}
	}

	pub fn cancel(&self) {
		self.inner.cancelled.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once [`CancellationToken::cancel`] has been called.
	pub async fn cancelled(&self) {
		loop {
			let notified = self.inner.notify.notified();
			if self.is_cancelled() {
				return;
			}
			notified.await;
		}
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn cancelled_resolves_after_cancel() {
		let token = CancellationToken::new();
		let waiter = {
			let token = token.clone();
			tokio::spawn(async move { token.cancelled().await })
		};

		tokio::task::yield_now().await;
		assert!(!token.is_cancelled());
		token.cancel();

		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.unwrap()
			.unwrap();
	}

	#[tokio::test]
	async fn cancelled_returns_immediately_when_already_cancelled() {
		let token = CancellationToken::new();
		token.cancel();
		tokio::time::timeout(Duration::from_millis(10), token.cancelled())
			.await
			.unwrap();
	}
}
