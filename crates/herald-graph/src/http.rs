// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a consistent User-Agent header.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::Result;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the Herald User-Agent string: `herald/{version}`.
pub fn user_agent() -> String {
	format!("herald/{}", env!("CARGO_PKG_VERSION"))
}

/// Client builder with the Herald User-Agent and default timeout.
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.timeout(DEFAULT_TIMEOUT)
}

pub fn new_client() -> Result<Client> {
	Ok(builder().build()?)
}
