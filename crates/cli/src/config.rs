//! TOML settings for the driver.
//!
//! ```toml
//! [snapshot]
//! capacity = 32
//!
//! [stress]
//! writers = 1000
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use std::path::{Path, PathBuf};

use coolthings_collections::SnapshotOptions;
use serde::Deserialize;
use thiserror::Error;

/// Writer threads used by `stress` when nothing else is configured.
pub const DEFAULT_WRITERS: usize = 1_000;

/// Largest accepted `snapshot.capacity`.
pub const MAX_SNAPSHOT_CAPACITY: usize = 1 << 20;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading the settings file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for '{field}': {reason}")]
	Invalid {
		/// Dotted path of the offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressSettings {
	pub writers: usize,
}

impl Default for StressSettings {
	fn default() -> Self {
		Self { writers: DEFAULT_WRITERS }
	}
}

/// Complete driver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	pub snapshot: SnapshotOptions,
	pub stress: StressSettings,
}

impl Settings {
	/// Parses and validates settings from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let settings: Self = toml::from_str(text)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Reads settings from `path`.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Loads `path` when given, otherwise returns defaults.
	pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
		match path {
			Some(path) => Self::load(path),
			None => Ok(Self::default()),
		}
	}

	/// Applies command-line overrides, then re-validates.
	pub fn with_overrides(mut self, capacity: Option<usize>, writers: Option<usize>) -> Result<Self, ConfigError> {
		if let Some(capacity) = capacity {
			self.snapshot.capacity = capacity;
		}
		if let Some(writers) = writers {
			self.stress.writers = writers;
		}
		self.validate()?;
		Ok(self)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.snapshot.capacity == 0 {
			return Err(ConfigError::Invalid {
				field: "snapshot.capacity",
				reason: "must be at least 1",
			});
		}
		if self.snapshot.capacity > MAX_SNAPSHOT_CAPACITY {
			return Err(ConfigError::Invalid {
				field: "snapshot.capacity",
				reason: "must be at most 1048576",
			});
		}
		if self.stress.writers == 0 {
			return Err(ConfigError::Invalid {
				field: "stress.writers",
				reason: "must be at least 1",
			});
		}
		Ok(())
	}
}
