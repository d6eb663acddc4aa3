use std::{
	path::{Path, PathBuf},
	str::FromStr,
};

use krim_common as wire;
use serde::{Deserialize, Serialize};

use crate::{
	error::{Error, Result},
	events::EventTypeSet,
};

pub const DEFAULT_OBJECT: &str = "/usr/lib/krim/krim.bpf.o";

/// What to observe and where to write it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
	/// Empty means every kind.
	pub events: EventTypeSet,
	pub output: Option<PathBuf>,
}

impl Options {
	pub fn validate(&self) -> Result<()> {
		self.events.validate()?;

		let Some(path) = &self.output else {
			return Ok(());
		};
		let invalid = |reason| Error::InvalidOutputPath {
			path: path.display().to_string(),
			reason,
		};

		if path.as_os_str().is_empty() {
			return Err(invalid("empty path"));
		}
		if path.is_dir() {
			return Err(invalid("is a directory"));
		}
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			if !parent.is_dir() {
				return Err(invalid("parent directory does not exist"));
			}
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EbpfConfig {
	/// Compiled kernel object.
	pub object: PathBuf,
	pub perf_map: String,
}

impl Default for EbpfConfig {
	fn default() -> Self {
		Self {
			object: PathBuf::from(DEFAULT_OBJECT),
			perf_map: wire::EVENTS_MAP.to_string(),
		}
	}
}

/// File layout:
///
/// ```toml
/// events = ["bpf", "ptrace"]
/// output = "/var/log/krim/events.json"
///
/// [ebpf]
/// object = "/usr/lib/krim/krim.bpf.o"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	#[serde(flatten)]
	pub options: Options,
	pub ebpf: EbpfConfig,
}

impl FromStr for Config {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let config: Config = toml::from_str(s)?;
		Ok(config)
	}
}

impl Config {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		if !path.is_file() {
			return Err(Error::ConfigNotFound(path.display().to_string()));
		}

		let content = std::fs::read_to_string(path)?;
		content.parse()
	}
}

// region:    --- Tests


// endregion: --- Tests
