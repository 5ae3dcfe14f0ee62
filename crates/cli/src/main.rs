//! `coolthings` driver binary.
//!
//! Runs the guarded map under many concurrent writers, walks generated maps
//! through the bounded snapshot queue, and tallies message-type codes.

mod cli;
mod commands;
mod config;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Command};
use config::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let settings = Settings::load_or_default(cli.config.as_deref())?;
	info!(?settings, "settings loaded");

	match cli.command {
		Command::Stress { writers } => {
			let settings = settings.with_overrides(None, writers)?;
			let writers = settings.stress.writers;
			let len = commands::stress(writers)?;
			println!("{writers} writers, {len} keys");
		}
		Command::Walk { entries, capacity, take } => {
			let settings = settings.with_overrides(capacity, None)?;
			let summary = commands::walk(entries, settings.snapshot, take).await;
			println!(
				"walk #{}: received {} of {} (sum {}), high water {}/{}, {:?}",
				summary.report.generation,
				summary.received,
				summary.report.total,
				summary.value_sum,
				summary.high_water,
				settings.snapshot.capacity,
				summary.report.outcome,
			);
		}
		Command::Tally { rows, capacity } => {
			let settings = settings.with_overrides(capacity, None)?;
			for (message_type, count) in commands::tally(&rows, settings.snapshot).await {
				println!("There is {count} {message_type}");
			}
		}
	}

	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("coolthings=debug,warn")
			} else {
				EnvFilter::new("coolthings=info,warn")
			}
		})
	};

	// COOLTHINGS_LOG_DIR sends logs to a per-process file instead of stderr.
	if let Some(log_dir) = std::env::var("COOLTHINGS_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("coolthings.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false).with_target(true);

			tracing_subscriber::registry().with(filter()).with(file_layer).init();

			info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::stderr).init();
}
