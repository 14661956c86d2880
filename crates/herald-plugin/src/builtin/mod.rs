// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod cloudflare;
mod log;

pub use cloudflare::CloudflarePlugin;
pub use log::LogPlugin;
