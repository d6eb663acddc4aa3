use krim_common as wire;
use serde::Serialize;

use crate::{
	error::Result,
	events::{codes::PtraceRequest, cursor::Cursor},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PtraceEvent {
	pub request: PtraceRequest,
	/// Tracee.
	pub pid: u32,
	pub address: u64,
	pub retval: i32,
}

impl PtraceEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::PtraceEvent = cursor.read()?;
		Ok(Self {
			request: PtraceRequest(raw.request),
			pid: raw.pid,
			address: raw.address,
			retval: raw.retval,
		})
	}
}
