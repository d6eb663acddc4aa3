use serde::Serialize;

use crate::{
	error::{Error, Result},
	events::{
		BpfEvent, BpfFilterEvent, DeleteModuleEvent, Event, EventType, Header, InitModuleEvent, KprobeEvent, Payload,
		ProcessContext, PtraceEvent, SysCtlEvent,
	},
};

/// JSON view of an [`Event`]: `header` and `process` always, plus exactly one kind-specific
/// section keyed by the kind's canonical name.
#[derive(Debug, Serialize)]
pub struct EventSerializer<'a> {
	pub header: &'a Header,
	pub process: &'a ProcessContext,
	#[serde(flatten)]
	section: Section<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Section<'a> {
	InitModule(&'a InitModuleEvent),
	DeleteModule(&'a DeleteModuleEvent),
	Bpf(&'a BpfEvent),
	BpfFilter(&'a BpfFilterEvent),
	Ptrace(&'a PtraceEvent),
	Kprobe(&'a KprobeEvent),
	#[serde(rename = "sysctl")]
	SysCtl(&'a SysCtlEvent),
}

impl<'a> EventSerializer<'a> {
	/// The section is chosen by the header type; the payload has to agree with it.
	pub fn new(event: &'a Event) -> Result<Self> {
		let kind = event.header.kind;
		let section = match (kind, &event.payload) {
			(EventType::InitModule, Payload::InitModule(e)) => Section::InitModule(e),
			(EventType::DeleteModule, Payload::DeleteModule(e)) => Section::DeleteModule(e),
			(EventType::Bpf, Payload::Bpf(e)) => Section::Bpf(e),
			(EventType::BpfFilter, Payload::BpfFilter(e)) => Section::BpfFilter(e),
			(EventType::Ptrace, Payload::Ptrace(e)) => Section::Ptrace(e),
			(EventType::Kprobe, Payload::Kprobe(e)) => Section::Kprobe(e),
			(EventType::SysCtl, Payload::SysCtl(e)) => Section::SysCtl(e),
			(kind, payload) => {
				return Err(Error::MismatchedPayload {
					kind,
					payload: payload.kind(),
				})
			}
		};

		Ok(Self {
			header: &event.header,
			process: &event.process,
			section,
		})
	}
}

pub fn serialize(event: &Event) -> Result<serde_json::Value> {
	let value = serde_json::to_value(EventSerializer::new(event)?)?;
	Ok(value)
}

/// One newline-terminated JSON record.
pub fn to_json_line(event: &Event) -> Result<Vec<u8>> {
	let mut line = serde_json::to_vec(&EventSerializer::new(event)?)?;
	line.push(b'\n');
	Ok(line)
}

// region:    --- Tests


// endregion: --- Tests
