use krim_common as wire;
use serde::Serialize;

use crate::{
	error::Result,
	events::cursor::{c_string, Cursor},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitModuleEvent {
	pub name: String,
	/// `init_module` (image in memory) rather than `finit_module` (image from a file).
	pub loaded_from_memory: bool,
	pub retval: i32,
}

impl InitModuleEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::InitModuleEvent = cursor.read()?;
		Ok(Self {
			name: c_string(&raw.name),
			loaded_from_memory: raw.loaded_from_memory != 0,
			retval: raw.retval,
		})
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteModuleEvent {
	pub name: String,
	pub flags: u32,
	pub retval: i32,
}

impl DeleteModuleEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::DeleteModuleEvent = cursor.read()?;
		Ok(Self {
			name: c_string(&raw.name),
			flags: raw.flags,
			retval: raw.retval,
		})
	}
}
