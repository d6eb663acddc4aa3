//! Decoding of the binary records emitted by the kernel-side programs.
//!
//! A record is `[EventHeader][ProcessContext][payload]`, with the payload shape selected by
//! the header discriminant. Nothing in the record carries its total length, so every
//! decoder validates its own bound through [`Cursor`].

// region:    --- Modules

mod bpf;
mod codes;
mod context;
mod cursor;
mod event_type;
mod kprobe;
mod module;
mod ptrace;
mod serializer;
mod sysctl;
mod time;

#[cfg(test)]
pub(crate) mod fixtures;

pub use bpf::{BpfEvent, BpfFilterEvent, BpfMap, BpfProgram, SockFilterInstruction, SocketInfo};
pub use codes::{BpfCmd, PtraceRequest, SockOpt};
pub use context::{Action, Header, ProcessContext};
pub use cursor::Cursor;
pub use event_type::{EventType, EventTypeSet};
pub use kprobe::{KprobeCommand, KprobeEvent, KprobeKind};
pub use module::{DeleteModuleEvent, InitModuleEvent};
pub use ptrace::PtraceEvent;
pub use serializer::{serialize, to_json_line, EventSerializer};
pub use sysctl::{SysCtlAction, SysCtlEvent};
pub use time::{BootClockResolver, TimeResolver};

// endregion: --- Modules

use std::fmt;

use crate::error::{Error, Result};

/// Kind-specific part of an event. `Empty` is the zero state of a reset event and never the
/// result of a successful decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
	#[default]
	Empty,
	InitModule(InitModuleEvent),
	DeleteModule(DeleteModuleEvent),
	Bpf(BpfEvent),
	BpfFilter(BpfFilterEvent),
	Ptrace(PtraceEvent),
	Kprobe(KprobeEvent),
	SysCtl(SysCtlEvent),
}

impl Payload {
	pub fn kind(&self) -> EventType {
		match self {
			Self::Empty => EventType::Unknown,
			Self::InitModule(_) => EventType::InitModule,
			Self::DeleteModule(_) => EventType::DeleteModule,
			Self::Bpf(_) => EventType::Bpf,
			Self::BpfFilter(_) => EventType::BpfFilter,
			Self::Ptrace(_) => EventType::Ptrace,
			Self::Kprobe(_) => EventType::Kprobe,
			Self::SysCtl(_) => EventType::SysCtl,
		}
	}

	/// Decodes the payload selected by `kind`. On failure the cursor is left where it was.
	pub fn decode(kind: EventType, cursor: &mut Cursor) -> Result<Self> {
		cursor.transaction(|c| {
			let payload = match kind {
				EventType::InitModule => Self::InitModule(InitModuleEvent::decode(c)?),
				EventType::DeleteModule => Self::DeleteModule(DeleteModuleEvent::decode(c)?),
				EventType::Bpf => Self::Bpf(BpfEvent::decode(c)?),
				EventType::BpfFilter => Self::BpfFilter(BpfFilterEvent::decode(c)?),
				EventType::Ptrace => Self::Ptrace(PtraceEvent::decode(c)?),
				EventType::Kprobe => Self::Kprobe(KprobeEvent::decode(c)?),
				EventType::SysCtl => Self::SysCtl(SysCtlEvent::decode(c)?),
				EventType::Unknown => return Err(Error::UnknownEventType(kind.discriminant())),
			};
			Ok(payload)
		})
	}
}

// region:    --- Standalone decoders

pub fn decode_header(data: &[u8], resolver: &dyn TimeResolver) -> Result<(Header, usize)> {
	let mut cursor = Cursor::new(data);
	let header = Header::decode(&mut cursor, resolver)?;
	Ok((header, cursor.position()))
}

pub fn decode_process_context(data: &[u8]) -> Result<(ProcessContext, usize)> {
	let mut cursor = Cursor::new(data);
	let process = ProcessContext::decode(&mut cursor)?;
	Ok((process, cursor.position()))
}

pub fn decode_payload(kind: EventType, data: &[u8]) -> Result<(Payload, usize)> {
	let mut cursor = Cursor::new(data);
	let payload = Payload::decode(kind, &mut cursor)?;
	Ok((payload, cursor.position()))
}

// endregion: --- Standalone decoders

/// One decoded kernel record.
///
/// [`Event::decode`] returns a fresh value. Hot loops can instead keep one scratch `Event`
/// per worker and call [`Event::decode_into`]; a scratch value must never be shared between
/// concurrent decoders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
	pub header: Header,
	pub process: ProcessContext,
	pub payload: Payload,
}

impl Event {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn decode(data: &[u8], resolver: &dyn TimeResolver) -> Result<Self> {
		let mut event = Self::new();
		event.decode_into(data, resolver)?;
		Ok(event)
	}

	pub fn kind(&self) -> EventType {
		self.header.kind
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Resets `self`, then decodes `data` into it and returns the number of bytes consumed.
	///
	/// Trailing bytes past the payload are ignored. When the payload fails to decode the
	/// header and process context stay readable for diagnostics but the payload stays
	/// `Empty`, so [`Event::is_complete`] is false and serialization refuses the event.
	pub fn decode_into(&mut self, data: &[u8], resolver: &dyn TimeResolver) -> Result<usize> {
		self.reset();
		let mut cursor = Cursor::new(data);

		self.header = Header::decode(&mut cursor, resolver)?;
		self.process = ProcessContext::decode(&mut cursor)?;
		self.payload = Payload::decode(self.header.kind, &mut cursor)?;

		Ok(cursor.position())
	}

	pub fn is_complete(&self) -> bool {
		self.header.kind != EventType::Unknown && self.payload.kind() == self.header.kind
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match serialize(self) {
			Ok(json) => write!(f, "{json}"),
			Err(err) => write!(f, "failed to serialize event: {err}"),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
