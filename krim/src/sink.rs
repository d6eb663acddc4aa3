use std::{
	fs::{File, OpenOptions, Permissions},
	io::Write,
	os::unix::fs::{OpenOptionsExt, PermissionsExt},
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicU64, Ordering},
		Mutex,
	},
};

use tracing::{debug, warn};

use crate::{
	error::{Error, Result},
	events::{to_json_line, Event},
};

pub const SINK_FILE_MODE: u32 = 0o644;

/// Line-delimited JSON file shared by every worker. Each record is a single `write_all`
/// under the lock, so lines never interleave.
#[derive(Debug)]
pub struct JsonSink {
	path: PathBuf,
	file: Mutex<Option<File>>,
	write_failures: AtomicU64,
}

impl JsonSink {
	/// Creates or truncates `path` with mode 0644 regardless of the umask.
	pub fn create(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(SINK_FILE_MODE)
			.open(&path)?;
		file.set_permissions(Permissions::from_mode(SINK_FILE_MODE))?;
		debug!(path = %path.display(), "json sink opened");

		Ok(Self {
			path,
			file: Mutex::new(Some(file)),
			write_failures: AtomicU64::new(0),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn write_event(&self, event: &Event) -> Result<()> {
		let line = to_json_line(event)?;
		self.write_line(&line)
	}

	/// `line` is expected to carry its trailing newline.
	pub fn write_line(&self, line: &[u8]) -> Result<()> {
		let mut file = self.file.lock()?;
		let file = file.as_mut().ok_or(Error::SinkClosed)?;

		if let Err(err) = file.write_all(line) {
			let failures = self.write_failures.fetch_add(1, Ordering::Relaxed) + 1;
			warn!(path = %self.path.display(), failures, "json sink write failed: {err}");
			return Err(err.into());
		}
		Ok(())
	}

	pub fn write_failures(&self) -> u64 {
		self.write_failures.load(Ordering::Relaxed)
	}

	pub fn is_closed(&self) -> bool {
		self.file.lock().map(|file| file.is_none()).unwrap_or(true)
	}

	/// Flushes and syncs. Later writes fail with `SinkClosed`; closing twice is a no-op.
	pub fn close(&self) -> Result<()> {
		let Some(mut file) = self.file.lock()?.take() else {
			return Ok(());
		};
		file.flush()?;
		file.sync_all()?;
		debug!(path = %self.path.display(), "json sink closed");
		Ok(())
	}
}

// region:    --- Tests


// endregion: --- Tests
