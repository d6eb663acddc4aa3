use krim_common as wire;
use serde::Serialize;

use crate::{
	error::{Error, Result},
	events::cursor::{check_limit, sized_string, Cursor},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KprobeCommand {
	#[default]
	Register,
	Unregister,
	Enable,
	Disable,
}

impl TryFrom<u32> for KprobeCommand {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			0 => Ok(Self::Register),
			1 => Ok(Self::Unregister),
			2 => Ok(Self::Enable),
			3 => Ok(Self::Disable),
			other => Err(Error::malformed("cmd", format!("unknown kprobe command {other}"))),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KprobeKind {
	#[default]
	Kprobe,
	Kretprobe,
}

impl TryFrom<u32> for KprobeKind {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			0 => Ok(Self::Kprobe),
			1 => Ok(Self::Kretprobe),
			other => Err(Error::malformed("kprobe_type", format!("unknown kprobe type {other}"))),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KprobeEvent {
	pub cmd: KprobeCommand,
	#[serde(rename = "type")]
	pub kind: KprobeKind,
	pub symbol: String,
	pub address: u64,
	pub retval: i32,
}

impl KprobeEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::KprobeHeader = cursor.read()?;
		let cmd = KprobeCommand::try_from(raw.cmd)?;
		let kind = KprobeKind::try_from(raw.kprobe_type)?;

		let len = raw.symbol_len as usize;
		check_limit("symbol_len", len, wire::KSYM_NAME_LEN)?;
		let symbol = sized_string(cursor.read_bytes(len, "symbol")?);

		Ok(Self {
			cmd,
			kind,
			symbol,
			address: raw.address,
			retval: raw.retval,
		})
	}
}
