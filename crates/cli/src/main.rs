//! Stockroom terminal client.
//!
//! Lists inventory, deliveries and the transaction ledger, follows live
//! delivery tracking, and performs the manager-only stock operations.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use stockroom_sync::ClientConfig;
use stockroom_sync::config::{BACKEND_URL_ENV, config_dir};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod credentials;
mod render;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	let mut config = ClientConfig::load_default().context("loading configuration")?;
	if let Some(url) = cli.backend {
		config
			.apply_overrides(|var| (var == BACKEND_URL_ENV).then(|| url.clone()))
			.context("invalid --backend")?;
	}
	if config.api.token.is_none()
		&& let Some(dir) = config_dir()
	{
		config.api.token = credentials::load(&dir).context("reading saved token")?;
	}

	tracing::debug!(backend = %config.api.base_url, authenticated = config.api.token.is_some(), "Configuration loaded");

	commands::run(cli.command, config).await
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::prelude::*;

	if let Some(log_dir) = std::env::var("STOCKROOM_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("stockroom.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
				if verbose {
					EnvFilter::new("stockroom_sync=trace,stockroom=debug,info")
				} else {
					EnvFilter::new("stockroom_sync=debug,stockroom=debug,info")
				}
			});

			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);

			tracing_subscriber::registry().with(filter).with(file_layer).init();

			tracing::info!(path = ?log_path, "Tracing initialized");
			return;
		}
	}

	// Stderr, kept quiet so tables on stdout stay readable.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(stderr_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), verbose))
		.init();
}

/// `RUST_LOG` when set and valid, otherwise warnings (or debug with `--verbose`).
fn stderr_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
	rust_log
		.filter(|directives| !directives.trim().is_empty())
		.and_then(|directives| EnvFilter::try_new(directives).ok())
		.unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }))
}
