// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for herald-server.

pub mod graph;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod paths;
pub mod plugins;
pub mod tasks;
pub mod teams;

pub use graph::{GraphConfig, GraphConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use lifecycle::{LifecycleConfig, LifecycleConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use paths::{PathsConfig, PathsConfigLayer};
pub use plugins::{PluginAuthMode, PluginConfig, PluginConfigLayer, RESERVED_ROUTES};
pub use tasks::{CronField, TaskConfig, TaskConfigLayer};
pub use teams::{TeamsConfig, TeamsConfigLayer};
