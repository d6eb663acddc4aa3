// Names and keys shared with the kernel-side programs. The baseline `sys_exit` program
// tail-calls through `SYS_EXIT_PROGS_MAP` using the keys below.

pub const EVENTS_MAP: &str = "events";
pub const SYS_EXIT_PROGS_MAP: &str = "sys_exit_progs";

pub const SYS_EXIT_INIT_MODULE_KEY: u32 = 0;
pub const SYS_EXIT_DELETE_MODULE_KEY: u32 = 1;
pub const SYS_EXIT_BPF_KEY: u32 = 2;
pub const SYS_EXIT_SETSOCKOPT_KEY: u32 = 3;
pub const SYS_EXIT_PTRACE_KEY: u32 = 4;
