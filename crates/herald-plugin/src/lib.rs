// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Third-party webhook integrations.
//!
//! Each configured plugin gets a route, an [`AuthPolicy`] and a handler. The
//! [`PluginFactory`] turns configuration into a [`PluginRegistry`] once at
//! startup; the HTTP layer then holds the registry behind an `Arc` and looks
//! plugins up by route.

pub mod auth;
mod builtin;
pub mod error;
pub mod factory;
pub mod registry;

pub use auth::{authenticate, authenticate_plain_header, AuthMode, AuthOutcome, AuthPolicy};
pub use builtin::{CloudflarePlugin, LogPlugin};
pub use error::{PluginError, Result};
pub use factory::{ChatSender, PluginContext, PluginDefinition, PluginFactory};
pub use registry::{Plugin, PluginRegistration, PluginRegistry};
