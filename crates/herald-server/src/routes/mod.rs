// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP handlers.

pub mod callback;
pub mod chat;
pub mod health;
pub mod webhooks;
