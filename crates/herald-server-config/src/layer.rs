// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	GraphConfigLayer, HttpConfigLayer, LifecycleConfigLayer, LoggingConfigLayer, PathsConfigLayer,
	PluginConfigLayer, TaskConfigLayer, TeamsConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub graph: Option<GraphConfigLayer>,
	#[serde(default)]
	pub teams: Option<TeamsConfigLayer>,
	#[serde(default)]
	pub paths: Option<PathsConfigLayer>,
	#[serde(default)]
	pub lifecycle: Option<LifecycleConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	/// Replaced wholesale by a higher layer, never merged entry by entry.
	#[serde(default)]
	pub plugins: Option<Vec<PluginConfigLayer>>,
	/// Replaced wholesale, like `plugins`.
	#[serde(default)]
	pub tasks: Option<Vec<TaskConfigLayer>>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.graph, other.graph, GraphConfigLayer::merge);
		merge_option(&mut self.teams, other.teams, TeamsConfigLayer::merge);
		merge_option(&mut self.paths, other.paths, PathsConfigLayer::merge);
		merge_option(
			&mut self.lifecycle,
			other.lifecycle,
			LifecycleConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		if other.plugins.is_some() {
			self.plugins = other.plugins;
		}
		if other.tasks.is_some() {
			self.tasks = other.tasks;
		}
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
