use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

/// Translates kernel monotonic timestamps (`bpf_ktime_get_ns`) into wall-clock time.
pub trait TimeResolver: Send + Sync {
	fn resolve(&self, monotonic_ns: u64) -> Result<SystemTime>;
}

#[derive(Debug, Clone, Default)]
pub struct BootClockResolver {
	boot_epoch: Option<SystemTime>,
}

impl BootClockResolver {
	/// Calibrated against `CLOCK_MONOTONIC` right away.
	pub fn new() -> Result<Self> {
		let mut resolver = Self::uncalibrated();
		resolver.calibrate()?;
		Ok(resolver)
	}

	pub fn uncalibrated() -> Self {
		Self { boot_epoch: None }
	}

	pub fn with_epoch(boot_epoch: SystemTime) -> Self {
		Self {
			boot_epoch: Some(boot_epoch),
		}
	}

	pub fn boot_epoch(&self) -> Option<SystemTime> {
		self.boot_epoch
	}

	pub fn calibrate(&mut self) -> Result<()> {
		let monotonic = monotonic_now()?;
		let now = SystemTime::now();
		let epoch = now
			.checked_sub(monotonic)
			.ok_or_else(|| Error::custom("monotonic clock ahead of wall clock"))?;
		self.boot_epoch = Some(epoch);
		Ok(())
	}
}

impl TimeResolver for BootClockResolver {
	fn resolve(&self, monotonic_ns: u64) -> Result<SystemTime> {
		self.boot_epoch
			.and_then(|epoch| epoch.checked_add(Duration::from_nanos(monotonic_ns)))
			.ok_or(Error::BadTimestamp(monotonic_ns))
	}
}

fn monotonic_now() -> Result<Duration> {
	let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
	let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
	if ret != 0 {
		return Err(std::io::Error::last_os_error().into());
	}
	Ok(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
}

// region:    --- Tests


// endregion: --- Tests
