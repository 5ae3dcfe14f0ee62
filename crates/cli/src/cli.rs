use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coolthings")]
#[command(about = "Exercise the guarded map and the snapshot walk")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (TOML)
	#[arg(long, short = 'c', value_name = "PATH", global = true)]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(long, short, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Insert distinct keys from concurrent writer threads and report the count
	Stress {
		/// Number of writer threads (overrides `[stress] writers`)
		#[arg(long, short)]
		writers: Option<usize>,
	},
	/// Walk a generated map through the bounded snapshot queue
	Walk {
		/// Number of entries in the generated map
		#[arg(long, short, default_value_t = 100)]
		entries: usize,

		/// Queue capacity (overrides `[snapshot] capacity`)
		#[arg(long)]
		capacity: Option<usize>,

		/// Stop after this many entries and cancel the rest of the walk
		#[arg(long)]
		take: Option<usize>,
	},
	/// Count message-type codes and walk the resulting counts
	Tally {
		/// Rows as JSON values; anything unparsable is kept as a string
		rows: Vec<String>,

		/// Queue capacity (overrides `[snapshot] capacity`)
		#[arg(long)]
		capacity: Option<usize>,
	},
}
