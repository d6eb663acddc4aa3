use std::mem::size_of;

use krim_common as wire;
use serde::Serialize;

use crate::{
	error::Result,
	events::{
		codes::{BpfCmd, SockOpt},
		cursor::{c_string, check_limit, Cursor},
	},
};

// region:    --- bpf(2)

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BpfEvent {
	pub cmd: BpfCmd,
	pub prog: BpfProgram,
	pub map: BpfMap,
	pub retval: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BpfProgram {
	pub id: u32,
	pub name: String,
	pub tag: String,
	pub prog_type: u32,
	pub attach_type: u32,
	/// Helper ids the program calls, ascending.
	pub helpers: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BpfMap {
	pub id: u32,
	pub name: String,
	pub map_type: u32,
}

impl BpfEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::BpfEvent = cursor.read()?;
		Ok(Self {
			cmd: BpfCmd(raw.cmd),
			prog: BpfProgram {
				id: raw.prog.id,
				name: c_string(&raw.prog.name),
				tag: hex_tag(&raw.prog.tag),
				prog_type: raw.prog.prog_type,
				attach_type: raw.prog.attach_type,
				helpers: helper_ids(&raw.prog.helpers),
			},
			map: BpfMap {
				id: raw.map.id,
				name: c_string(&raw.map.name),
				map_type: raw.map.map_type,
			},
			retval: raw.retval,
		})
	}
}

fn helper_ids(words: &[u64]) -> Vec<u32> {
	let mut ids = Vec::new();
	for (word_idx, word) in words.iter().enumerate() {
		for bit in 0..u64::BITS {
			if word & (1u64 << bit) != 0 {
				ids.push(word_idx as u32 * u64::BITS + bit);
			}
		}
	}
	ids
}

fn hex_tag(tag: &[u8]) -> String {
	tag.iter().map(|b| format!("{b:02x}")).collect()
}

// endregion: --- bpf(2)

// region:    --- Socket filters

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BpfFilterEvent {
	pub optname: SockOpt,
	pub socket: SocketInfo,
	pub filter: Vec<SockFilterInstruction>,
	pub retval: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocketInfo {
	pub family: u16,
	#[serde(rename = "type")]
	pub socket_type: u16,
	pub protocol: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SockFilterInstruction {
	pub code: u16,
	pub jt: u8,
	pub jf: u8,
	pub k: u32,
}

impl BpfFilterEvent {
	pub fn decode(cursor: &mut Cursor) -> Result<Self> {
		let raw: wire::BpfFilterHeader = cursor.read()?;

		let count = raw.filter_len as usize;
		check_limit("filter_len", count, wire::BPF_MAXINSNS)?;
		// Reserve the whole trailer first so a short buffer fails as a bad length.
		let mut insns = Cursor::new(cursor.read_bytes(count * size_of::<wire::SockFilter>(), "filter")?);

		let mut filter = Vec::with_capacity(count);
		for _ in 0..count {
			let insn: wire::SockFilter = insns.read()?;
			filter.push(SockFilterInstruction {
				code: insn.code,
				jt: insn.jt,
				jf: insn.jf,
				k: insn.k,
			});
		}

		Ok(Self {
			optname: SockOpt(raw.optname),
			socket: SocketInfo {
				family: raw.family,
				socket_type: raw.socket_type,
				protocol: raw.protocol,
			},
			filter,
			retval: raw.retval,
		})
	}
}

// endregion: --- Socket filters

// region:    --- Tests

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn helper_bitmask_decodes_to_ids() {
		let fx_words = [0b1010u64, 0, 1u64 << 63];
		assert_eq!(vec![1, 3, 191], helper_ids(&fx_words));
	}

	#[test]
	fn tag_is_lowercase_hex() {
		assert_eq!("00ff10ab00000001", hex_tag(&[0x00, 0xff, 0x10, 0xab, 0, 0, 0, 1]));
	}
}

// endregion: --- Tests
