// Numeric kernel codes that keep their raw value but display by name. A value with no known
// name displays as `PREFIX(n)`; it is not a decode error.

macro_rules! named_code {
	($(#[$meta:meta])* $name:ident, $prefix:literal, { $($value:literal => $label:literal),* $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
		pub struct $name(pub u32);

		impl $name {
			pub fn name(self) -> Option<&'static str> {
				match self.0 {
					$($value => Some($label),)*
					_ => None,
				}
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				match self.name() {
					Some(name) => f.write_str(name),
					None => write!(f, "{}({})", $prefix, self.0),
				}
			}
		}

		impl serde::Serialize for $name {
			fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
				serializer.collect_str(self)
			}
		}
	};
}

named_code!(
	/// `cmd` argument of the `bpf(2)` syscall.
	BpfCmd, "BPF_CMD", {
	0 => "BPF_MAP_CREATE",
	1 => "BPF_MAP_LOOKUP_ELEM",
	2 => "BPF_MAP_UPDATE_ELEM",
	3 => "BPF_MAP_DELETE_ELEM",
	4 => "BPF_MAP_GET_NEXT_KEY",
	5 => "BPF_PROG_LOAD",
	6 => "BPF_OBJ_PIN",
	7 => "BPF_OBJ_GET",
	8 => "BPF_PROG_ATTACH",
	9 => "BPF_PROG_DETACH",
	10 => "BPF_PROG_TEST_RUN",
	11 => "BPF_PROG_GET_NEXT_ID",
	12 => "BPF_MAP_GET_NEXT_ID",
	13 => "BPF_PROG_GET_FD_BY_ID",
	14 => "BPF_MAP_GET_FD_BY_ID",
	15 => "BPF_OBJ_GET_INFO_BY_FD",
	16 => "BPF_PROG_QUERY",
	17 => "BPF_RAW_TRACEPOINT_OPEN",
	18 => "BPF_BTF_LOAD",
	19 => "BPF_BTF_GET_FD_BY_ID",
	20 => "BPF_TASK_FD_QUERY",
	21 => "BPF_MAP_LOOKUP_AND_DELETE_ELEM",
	22 => "BPF_MAP_FREEZE",
	23 => "BPF_BTF_GET_NEXT_ID",
	24 => "BPF_MAP_LOOKUP_BATCH",
	25 => "BPF_MAP_LOOKUP_AND_DELETE_BATCH",
	26 => "BPF_MAP_UPDATE_BATCH",
	27 => "BPF_MAP_DELETE_BATCH",
	28 => "BPF_LINK_CREATE",
	29 => "BPF_LINK_UPDATE",
	30 => "BPF_LINK_GET_FD_BY_ID",
	31 => "BPF_LINK_GET_NEXT_ID",
	32 => "BPF_ENABLE_STATS",
	33 => "BPF_ITER_CREATE",
	34 => "BPF_LINK_DETACH",
	35 => "BPF_PROG_BIND_MAP",
	36 => "BPF_TOKEN_CREATE",
});

named_code!(
	/// `request` argument of `ptrace(2)`.
	PtraceRequest, "PTRACE_REQUEST", {
	0 => "PTRACE_TRACEME",
	1 => "PTRACE_PEEKTEXT",
	2 => "PTRACE_PEEKDATA",
	3 => "PTRACE_PEEKUSR",
	4 => "PTRACE_POKETEXT",
	5 => "PTRACE_POKEDATA",
	6 => "PTRACE_POKEUSR",
	7 => "PTRACE_CONT",
	8 => "PTRACE_KILL",
	9 => "PTRACE_SINGLESTEP",
	12 => "PTRACE_GETREGS",
	13 => "PTRACE_SETREGS",
	14 => "PTRACE_GETFPREGS",
	15 => "PTRACE_SETFPREGS",
	16 => "PTRACE_ATTACH",
	17 => "PTRACE_DETACH",
	24 => "PTRACE_SYSCALL",
	0x4200 => "PTRACE_SETOPTIONS",
	0x4201 => "PTRACE_GETEVENTMSG",
	0x4202 => "PTRACE_GETSIGINFO",
	0x4203 => "PTRACE_SETSIGINFO",
	0x4204 => "PTRACE_GETREGSET",
	0x4205 => "PTRACE_SETREGSET",
	0x4206 => "PTRACE_SEIZE",
	0x4207 => "PTRACE_INTERRUPT",
	0x4208 => "PTRACE_LISTEN",
});

named_code!(
	/// `optname` of a `setsockopt(2)` call touching socket filters.
	SockOpt, "SOCKOPT", {
	26 => "SO_ATTACH_FILTER",
	27 => "SO_DETACH_FILTER",
	44 => "SO_LOCK_FILTER",
	50 => "SO_ATTACH_BPF",
	51 => "SO_ATTACH_REUSEPORT_CBPF",
	52 => "SO_ATTACH_REUSEPORT_EBPF",
	68 => "SO_DETACH_REUSEPORT_BPF",
});

// region:    --- Tests

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn named_codes_display_name_or_sentinel() {
		assert_eq!("BPF_PROG_LOAD", BpfCmd(5).to_string());
		assert_eq!("BPF_CMD(99)", BpfCmd(99).to_string());
		assert_eq!("PTRACE_SEIZE", PtraceRequest(0x4206).to_string());
		assert_eq!("SO_ATTACH_BPF", SockOpt(50).to_string());
		assert_eq!(None, SockOpt(1).name());
	}
}

// endregion: --- Tests
