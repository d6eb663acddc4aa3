use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const EVENT_UNKNOWN: u32 = 0;
pub const EVENT_INIT_MODULE: u32 = 1;
pub const EVENT_DELETE_MODULE: u32 = 2;
pub const EVENT_BPF: u32 = 3;
pub const EVENT_BPF_FILTER: u32 = 4;
pub const EVENT_PTRACE: u32 = 5;
pub const EVENT_KPROBE: u32 = 6;
pub const EVENT_SYSCTL: u32 = 7;

pub const TASK_COMM_LEN: usize = 16;
pub const MODULE_NAME_LEN: usize = 56;
pub const BPF_OBJ_NAME_LEN: usize = 16;
pub const BPF_TAG_SIZE: usize = 8;
pub const BPF_HELPER_WORDS: usize = 3;

// Upper bounds of the variable-length trailers.
pub const BPF_MAXINSNS: usize = 4096;
pub const KSYM_NAME_LEN: usize = 512;
pub const SYSCTL_NAME_MAX: usize = 256;
pub const SYSCTL_VALUE_MAX: usize = 256;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EventHeader {
	pub timestamp: u64,  // 0..8 | bpf_ktime_get_ns()
	pub event_type: u32, // 8..12
	pub cpu: u32,        // 12..16
	pub action: u32,     // 16..20
	pub _pad0: u32,      // 20..24
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ProcessContext {
	pub cgroup_id: u64,             // 0..8
	pub mnt_ns: u32,                // 8..12
	pub net_ns: u32,                // 12..16
	pub pid: u32,                   // 16..20
	pub tid: u32,                   // 20..24
	pub ppid: u32,                  // 24..28
	pub uid: u32,                   // 28..32
	pub gid: u32,                   // 32..36
	pub euid: u32,                  // 36..40
	pub comm: [u8; TASK_COMM_LEN], // 40..56
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct InitModuleEvent {
	pub retval: i32,                  // 0..4
	pub loaded_from_memory: u32,      // 4..8 | 1 => init_module, 0 => finit_module
	pub name: [u8; MODULE_NAME_LEN], // 8..64
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DeleteModuleEvent {
	pub retval: i32,                  // 0..4
	pub flags: u32,                   // 4..8 | O_NONBLOCK, O_TRUNC
	pub name: [u8; MODULE_NAME_LEN], // 8..64
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct BpfProgInfo {
	pub id: u32,                           // 0..4
	pub prog_type: u32,                    // 4..8
	pub attach_type: u32,                  // 8..12
	pub _pad0: u32,                        // 12..16
	pub helpers: [u64; BPF_HELPER_WORDS], // 16..40 | bit n => helper n called
	pub name: [u8; BPF_OBJ_NAME_LEN],     // 40..56
	pub tag: [u8; BPF_TAG_SIZE],          // 56..64
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct BpfMapInfo {
	pub id: u32,                       // 0..4
	pub map_type: u32,                 // 4..8
	pub name: [u8; BPF_OBJ_NAME_LEN], // 8..24
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct BpfEvent {
	pub retval: i32,       // 0..4
	pub cmd: u32,          // 4..8
	pub prog: BpfProgInfo, // 8..72
	pub map: BpfMapInfo,   // 72..96
}

/// Followed by `filter_len` [`SockFilter`] instructions.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct BpfFilterHeader {
	pub retval: i32,      // 0..4
	pub optname: u32,     // 4..8
	pub family: u16,      // 8..10
	pub socket_type: u16, // 10..12
	pub protocol: u16,    // 12..14
	pub filter_len: u16,  // 14..16
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SockFilter {
	pub code: u16, // 0..2
	pub jt: u8,    // 2..3
	pub jf: u8,    // 3..4
	pub k: u32,    // 4..8
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PtraceEvent {
	pub retval: i32,   // 0..4
	pub request: u32,  // 4..8
	pub pid: u32,      // 8..12
	pub _pad0: u32,    // 12..16
	pub address: u64,  // 16..24
}

/// Followed by `symbol_len` bytes of symbol name.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct KprobeHeader {
	pub retval: i32,      // 0..4
	pub cmd: u32,         // 4..8 | 0 register, 1 unregister, 2 enable, 3 disable
	pub kprobe_type: u32, // 8..12 | 0 kprobe, 1 kretprobe
	pub symbol_len: u16,  // 12..14
	pub _pad0: u16,       // 14..16
	pub address: u64,     // 16..24
}

/// Followed by the sysctl name, the old value and the new value, in that order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SysCtlHeader {
	pub retval: i32,         // 0..4
	pub action: u32,         // 4..8 | 0 read, 1 write
	pub file_position: u32,  // 8..12
	pub name_len: u16,       // 12..14
	pub old_value_len: u16,  // 14..16
	pub new_value_len: u16,  // 16..18
	pub _pad0: u16,          // 18..20
}
