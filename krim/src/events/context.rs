use std::{
	fmt,
	mem::size_of,
	time::{SystemTime, UNIX_EPOCH},
};

use krim_common as wire;
use serde::{Serialize, Serializer};

use crate::{
	error::{Error, Result},
	events::{
		cursor::{c_string, Cursor},
		EventType, TimeResolver,
	},
};

/// What the kernel side did about the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	#[default]
	Log,
	Block,
	Kill,
	Paranoid,
}

impl TryFrom<u32> for Action {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			0 => Ok(Self::Log),
			1 => Ok(Self::Block),
			2 => Ok(Self::Kill),
			3 => Ok(Self::Paranoid),
			other => Err(Error::malformed("action", format!("unknown action {other}"))),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
	#[serde(serialize_with = "rfc3339")]
	pub timestamp: SystemTime,
	#[serde(rename = "type")]
	pub kind: EventType,
	pub cpu: u32,
	pub action: Action,
}

impl Default for Header {
	fn default() -> Self {
		Self {
			timestamp: UNIX_EPOCH,
			kind: EventType::Unknown,
			cpu: 0,
			action: Action::Log,
		}
	}
}

impl Header {
	pub const WIRE_SIZE: usize = size_of::<wire::EventHeader>();

	/// The discriminant is validated before anything else in the record is trusted.
	pub fn decode(cursor: &mut Cursor, resolver: &dyn TimeResolver) -> Result<Self> {
		cursor.transaction(|c| {
			let raw: wire::EventHeader = c.read()?;
			let kind = EventType::from_discriminant(raw.event_type)?;
			let timestamp = resolver.resolve(raw.timestamp)?;
			Ok(Self {
				timestamp,
				kind,
				cpu: raw.cpu,
				action: Action::try_from(raw.action)?,
			})
		})
	}
}

fn rfc3339<S: Serializer>(ts: &SystemTime, serializer: S) -> core::result::Result<S::Ok, S::Error> {
	serializer.collect_str(&humantime::format_rfc3339_nanos(*ts))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessContext {
	pub pid: u32,
	pub tid: u32,
	pub ppid: u32,
	pub uid: u32,
	pub gid: u32,
	pub euid: u32,
	pub comm: String,
	pub cgroup_id: u64,
	pub mnt_ns: u32,
	pub net_ns: u32,
}

impl ProcessContext {
	pub const WIRE_SIZE: usize = size_of::<wire::ProcessContext>();

	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::ProcessContext = cursor.read()?;
		Ok(Self {
			pid: raw.pid,
			tid: raw.tid,
			ppid: raw.ppid,
			uid: raw.uid,
			gid: raw.gid,
			euid: raw.euid,
			comm: c_string(&raw.comm),
			cgroup_id: raw.cgroup_id,
			mnt_ns: raw.mnt_ns,
			net_ns: raw.net_ns,
		})
	}
}

impl fmt::Display for ProcessContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (PID: {}, UID: {})", self.comm, self.pid, self.uid)
	}
}
