use krim_common as wire;
use serde::Serialize;

use crate::{
	error::{Error, Result},
	events::cursor::{check_limit, sized_string, Cursor},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SysCtlAction {
	#[default]
	Read,
	Write,
}

impl TryFrom<u32> for SysCtlAction {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			0 => Ok(Self::Read),
			1 => Ok(Self::Write),
			other => Err(Error::malformed("action", format!("unknown sysctl action {other}"))),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SysCtlEvent {
	pub action: SysCtlAction,
	pub name: String,
	pub old_value: String,
	pub new_value: String,
	pub file_position: u32,
	pub retval: i32,
}

impl SysCtlEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::SysCtlHeader = cursor.read()?;
		let action = SysCtlAction::try_from(raw.action)?;

		let name_len = raw.name_len as usize;
		let old_len = raw.old_value_len as usize;
		let new_len = raw.new_value_len as usize;
		check_limit("name_len", name_len, wire::SYSCTL_NAME_MAX)?;
		check_limit("old_value_len", old_len, wire::SYSCTL_VALUE_MAX)?;
		check_limit("new_value_len", new_len, wire::SYSCTL_VALUE_MAX)?;

		let name = sized_string(cursor.read_bytes(name_len, "name")?);
		let old_value = sized_string(cursor.read_bytes(old_len, "old_value")?);
		let new_value = sized_string(cursor.read_bytes(new_len, "new_value")?);

		Ok(Self {
			action,
			name,
			old_value,
			new_value,
			file_position: raw.file_position,
			retval: raw.retval,
		})
	}
}
