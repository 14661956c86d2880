// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Herald server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use herald_server::{create_router, vault_cli, Herald};
use herald_server_config::{LogFormat, LoggingConfig, ServerConfig};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod version;

/// Herald - Teams chat notification bot.
#[derive(Parser, Debug)]
#[command(name = "herald-server", about = "Herald chat notification server", version)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (the default)
	Serve {
		/// Config file to read instead of /etc/herald/server.toml
		#[arg(long, env = "HERALD_SERVER_CONFIG")]
		config: Option<PathBuf>,
	},
	/// Show version and build information
	Version,
	/// Manage the device credential vault
	Vault {
		#[command(subcommand)]
		command: VaultCommand,
	},
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
	/// Encrypt a credential and append it to the secrets file.
	///
	/// The master passphrase comes from HERALD_MASTER_PASSPHRASE, the password
	/// from HERALD_VAULT_PASSWORD or the first line of stdin.
	Seal {
		#[arg(long, default_value = "secrets.toml")]
		file: PathBuf,
		#[arg(long)]
		device_type: String,
		/// Regular expression matched against device names
		#[arg(long)]
		pattern: String,
		#[arg(long)]
		user: String,
	},
	/// Check that a device's credential decrypts, printing its user
	Unlock {
		#[arg(long, default_value = "secrets.toml")]
		file: PathBuf,
		#[arg(long)]
		device_type: String,
		name: String,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	match args.command.unwrap_or(Command::Serve { config: None }) {
		Command::Version => {
			println!("{}", version::format_version_info());
			Ok(())
		}
		Command::Vault { command } => run_vault(command),
		Command::Serve { config } => {
			let config = match config {
				Some(path) => herald_server_config::load_config_with_file(&path)
					.with_context(|| format!("loading configuration from {}", path.display()))?,
				None => herald_server_config::load_config().context("loading configuration")?,
			};
			serve(config).await
		}
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
	init_tracing(&config.logging);

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		base_url = %config.http.base_url,
		"starting herald-server"
	);

	let herald = Herald::build(&config).context("initialising herald")?;
	herald.start().await.context("starting token lifecycle")?;

	let app = create_router(herald.state.clone()).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("binding {addr}"))?;
	tracing::info!("listening on {}", addr);

	let result = axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "Failed to listen for shutdown signal");
		}
		tracing::info!("Received shutdown signal");
	})
	.await;

	tracing::info!("Shutting down job scheduler...");
	herald.shutdown().await;
	result.context("server error")?;

	tracing::info!("Server shutdown complete");
	Ok(())
}

fn run_vault(command: VaultCommand) -> anyhow::Result<()> {
	match command {
		VaultCommand::Seal {
			file,
			device_type,
			pattern,
			user,
		} => {
			let passphrase = herald_vault::master_passphrase()?;
			let password = vault_cli::read_password(std::io::stdin().lock())?;
			vault_cli::seal_into_store(&file, &device_type, &pattern, &user, &password, &passphrase)?;
			println!("Added {device_type} credential for {user} to {}", file.display());
		}
		VaultCommand::Unlock {
			file,
			device_type,
			name,
		} => {
			let user = vault_cli::check_unlock(&file, &device_type, &name)?;
			println!("{device_type}/{name}: credential for {user} decrypts");
		}
	}
	Ok(())
}
