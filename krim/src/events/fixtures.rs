// Test-only builders for kernel records, laid out with the wire structs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use krim_common as wire;
use zerocopy::IntoBytes;

use crate::events::{
	Action, BootClockResolver, BpfCmd, BpfEvent, BpfFilterEvent, BpfMap, BpfProgram, DeleteModuleEvent, EventType, Header,
	InitModuleEvent, KprobeCommand, KprobeEvent, KprobeKind, Payload, ProcessContext, PtraceEvent, PtraceRequest,
	SockFilterInstruction, SockOpt, SocketInfo, SysCtlAction, SysCtlEvent,
};

pub const FX_MONOTONIC_NS: u64 = 1_500_000_000;
pub const FX_CPU: u32 = 3;

pub fn fx_epoch() -> SystemTime {
	UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub fn resolver() -> BootClockResolver {
	BootClockResolver::with_epoch(fx_epoch())
}

pub fn name<const N: usize>(value: &str) -> [u8; N] {
	let mut out = [0u8; N];
	out[..value.len()].copy_from_slice(value.as_bytes());
	out
}

pub fn header(event_type: u32) -> wire::EventHeader {
	wire::EventHeader {
		timestamp: FX_MONOTONIC_NS,
		event_type,
		cpu: FX_CPU,
		action: 0,
		_pad0: 0,
	}
}

pub fn process() -> wire::ProcessContext {
	wire::ProcessContext {
		cgroup_id: 0x1234,
		mnt_ns: 4026531840,
		net_ns: 4026531992,
		pid: 4242,
		tid: 4243,
		ppid: 1,
		uid: 0,
		gid: 0,
		euid: 0,
		comm: name("insmod"),
	}
}

pub fn buffer(event_type: u32, payload: &[u8]) -> Vec<u8> {
	let mut buf = header(event_type).as_bytes().to_vec();
	buf.extend_from_slice(process().as_bytes());
	buf.extend_from_slice(payload);
	buf
}

pub fn expected_header(kind: EventType) -> Header {
	Header {
		timestamp: fx_epoch() + Duration::from_nanos(FX_MONOTONIC_NS),
		kind,
		cpu: FX_CPU,
		action: Action::Log,
	}
}

pub fn expected_process() -> ProcessContext {
	ProcessContext {
		pid: 4242,
		tid: 4243,
		ppid: 1,
		uid: 0,
		gid: 0,
		euid: 0,
		comm: "insmod".to_string(),
		cgroup_id: 0x1234,
		mnt_ns: 4026531840,
		net_ns: 4026531992,
	}
}

pub fn kprobe_header(symbol: &str) -> wire::KprobeHeader {
	wire::KprobeHeader {
		retval: 0,
		cmd: 0,
		kprobe_type: 1,
		symbol_len: symbol.len() as u16,
		_pad0: 0,
		address: 0xffff_ffff_8110_0000,
	}
}

pub fn sysctl_header(name: &str, old_value: &str, new_value: &str) -> wire::SysCtlHeader {
	wire::SysCtlHeader {
		retval: 0,
		action: 1,
		file_position: 0,
		name_len: name.len() as u16,
		old_value_len: old_value.len() as u16,
		new_value_len: new_value.len() as u16,
		_pad0: 0,
	}
}

/// One well-formed record per supported kind.
#[derive(Debug, Clone, Copy)]
pub enum FxKind {
	InitModule,
	DeleteModule,
	Bpf,
	BpfFilter,
	Ptrace,
	Kprobe,
	SysCtl,
}

impl FxKind {
	pub fn all() -> [FxKind; 7] {
		[
			Self::InitModule,
			Self::DeleteModule,
			Self::Bpf,
			Self::BpfFilter,
			Self::Ptrace,
			Self::Kprobe,
			Self::SysCtl,
		]
	}

	pub fn kind(self) -> EventType {
		match self {
			Self::InitModule => EventType::InitModule,
			Self::DeleteModule => EventType::DeleteModule,
			Self::Bpf => EventType::Bpf,
			Self::BpfFilter => EventType::BpfFilter,
			Self::Ptrace => EventType::Ptrace,
			Self::Kprobe => EventType::Kprobe,
			Self::SysCtl => EventType::SysCtl,
		}
	}

	pub fn buffer(self) -> Vec<u8> {
		buffer(self.kind().discriminant(), &self.payload())
	}

	pub fn payload(self) -> Vec<u8> {
		match self {
			Self::InitModule => wire::InitModuleEvent {
				retval: 0,
				loaded_from_memory: 1,
				name: name("rootkit"),
			}
			.as_bytes()
			.to_vec(),
			Self::DeleteModule => wire::DeleteModuleEvent {
				retval: -2,
				flags: 0o4000,
				name: name("rootkit"),
			}
			.as_bytes()
			.to_vec(),
			Self::Bpf => wire::BpfEvent {
				retval: 7,
				cmd: 5,
				prog: wire::BpfProgInfo {
					id: 91,
					prog_type: 2,
					attach_type: 0,
					_pad0: 0,
					helpers: [(1 << 6) | (1 << 12), 0, 0],
					name: name("hide_pid"),
					tag: [0xde, 0xad, 0xbe, 0xef, 0, 1, 2, 3],
				},
				map: wire::BpfMapInfo {
					id: 12,
					map_type: 1,
					name: name("pids"),
				},
			}
			.as_bytes()
			.to_vec(),
			Self::BpfFilter => {
				let raw = wire::BpfFilterHeader {
					retval: 0,
					optname: 26,
					family: 17,
					socket_type: 3,
					protocol: 768,
					filter_len: 2,
				};
				let mut out = raw.as_bytes().to_vec();
				out.extend_from_slice(
					wire::SockFilter {
						code: 0x28,
						jt: 0,
						jf: 0,
						k: 12,
					}
					.as_bytes(),
				);
				out.extend_from_slice(
					wire::SockFilter {
						code: 0x06,
						jt: 0,
						jf: 0,
						k: 0xffff,
					}
					.as_bytes(),
				);
				out
			}
			Self::Ptrace => wire::PtraceEvent {
				retval: 0,
				request: 4,
				pid: 1,
				_pad0: 0,
				address: 0x7fff_0000_1000,
			}
			.as_bytes()
			.to_vec(),
			Self::Kprobe => {
				let symbol = "kallsyms_lookup_name";
				let mut out = kprobe_header(symbol).as_bytes().to_vec();
				out.extend_from_slice(symbol.as_bytes());
				out
			}
			Self::SysCtl => {
				let (name, old_value, new_value) = ("kernel/modprobe", "/sbin/modprobe", "/tmp/x");
				let mut out = sysctl_header(name, old_value, new_value).as_bytes().to_vec();
				out.extend_from_slice(name.as_bytes());
				out.extend_from_slice(old_value.as_bytes());
				out.extend_from_slice(new_value.as_bytes());
				out
			}
		}
	}

	pub fn expected_payload(self) -> Payload {
		match self {
			Self::InitModule => Payload::InitModule(InitModuleEvent {
				name: "rootkit".to_string(),
				loaded_from_memory: true,
				retval: 0,
			}),
			Self::DeleteModule => Payload::DeleteModule(DeleteModuleEvent {
				name: "rootkit".to_string(),
				flags: 0o4000,
				retval: -2,
			}),
			Self::Bpf => Payload::Bpf(BpfEvent {
				cmd: BpfCmd(5),
				prog: BpfProgram {
					id: 91,
					name: "hide_pid".to_string(),
					tag: "deadbeef00010203".to_string(),
					prog_type: 2,
					attach_type: 0,
					helpers: vec![6, 12],
				},
				map: BpfMap {
					id: 12,
					name: "pids".to_string(),
					map_type: 1,
				},
				retval: 7,
			}),
			Self::BpfFilter => Payload::BpfFilter(BpfFilterEvent {
				optname: SockOpt(26),
				socket: SocketInfo {
					family: 17,
					socket_type: 3,
					protocol: 768,
				},
				filter: vec![
					SockFilterInstruction {
						code: 0x28,
						jt: 0,
						jf: 0,
						k: 12,
					},
					SockFilterInstruction {
						code: 0x06,
						jt: 0,
						jf: 0,
						k: 0xffff,
					},
				],
				retval: 0,
			}),
			Self::Ptrace => Payload::Ptrace(PtraceEvent {
				request: PtraceRequest(4),
				pid: 1,
				address: 0x7fff_0000_1000,
				retval: 0,
			}),
			Self::Kprobe => Payload::Kprobe(KprobeEvent {
				cmd: KprobeCommand::Register,
				kind: KprobeKind::Kretprobe,
				symbol: "kallsyms_lookup_name".to_string(),
				address: 0xffff_ffff_8110_0000,
				retval: 0,
			}),
			Self::SysCtl => Payload::SysCtl(SysCtlEvent {
				action: SysCtlAction::Write,
				name: "kernel/modprobe".to_string(),
				old_value: "/sbin/modprobe".to_string(),
				new_value: "/tmp/x".to_string(),
				file_position: 0,
				retval: 0,
			}),
		}
	}
}
