//! Attach plan assembly: which kernel programs to attach, and how they chain, for a set of
//! requested event kinds.

use std::collections::HashSet;
use std::fmt;

use krim_common as wire;
use serde::Serialize;
use tracing::debug;

use crate::events::{EventType, EventTypeSet};

/// Program name of the baseline dispatcher every kind depends on.
pub const SYS_EXIT: &str = "sys_exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
	TracePoint,
	KProbe,
	KRetProbe,
}

/// A kernel hook location. `id` is the program name inside the compiled object; for
/// tracepoints `target` is `category/name`, for probes it is the kernel symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttachPoint {
	pub id: &'static str,
	pub hook: HookType,
	pub target: &'static str,
}

impl AttachPoint {
	pub const fn tracepoint(id: &'static str, target: &'static str) -> Self {
		Self {
			id,
			hook: HookType::TracePoint,
			target,
		}
	}

	pub const fn kprobe(id: &'static str, target: &'static str) -> Self {
		Self {
			id,
			hook: HookType::KProbe,
			target,
		}
	}

	pub const fn kretprobe(id: &'static str, target: &'static str) -> Self {
		Self {
			id,
			hook: HookType::KRetProbe,
			target,
		}
	}

	/// Splits a tracepoint target into `(category, name)`.
	pub fn tracepoint_parts(&self) -> Option<(&'static str, &'static str)> {
		match self.hook {
			HookType::TracePoint => self.target.split_once('/'),
			_ => None,
		}
	}
}

impl fmt::Display for AttachPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let prefix = match self.hook {
			HookType::TracePoint => "tracepoint",
			HookType::KProbe => "kprobe",
			HookType::KRetProbe => "kretprobe",
		};
		write!(f, "{prefix}/{} ({})", self.target, self.id)
	}
}

/// Tail-call route: `source` jumps to `program` through slot `key` of `program_array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ControlFlowEdge {
	pub source: &'static str,
	pub program_array: &'static str,
	pub key: u32,
	pub program: &'static str,
}

impl ControlFlowEdge {
	const fn from_sys_exit(key: u32, program: &'static str) -> Self {
		Self {
			source: SYS_EXIT,
			program_array: wire::SYS_EXIT_PROGS_MAP,
			key,
			program,
		}
	}
}

/// Activation requirement over attach point ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
	/// Every listed attach point must be attached.
	AllOf(Vec<&'static str>),
	/// At least one listed attach point must be attached.
	OneOf(Vec<&'static str>),
}

impl Selector {
	pub fn ids(&self) -> &[&'static str] {
		match self {
			Self::AllOf(ids) | Self::OneOf(ids) => ids,
		}
	}

	pub fn is_satisfied(&self, attached: &HashSet<&str>) -> bool {
		match self {
			Self::AllOf(ids) => ids.iter().all(|id| attached.contains(id)),
			Self::OneOf(ids) => ids.iter().any(|id| attached.contains(id)),
		}
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::AllOf(ids) => write!(f, "all_of[{}]", ids.join(",")),
			Self::OneOf(ids) => write!(f, "one_of[{}]", ids.join(",")),
		}
	}
}

// region:    --- AttachPlan

/// Immutable descriptors of everything a runtime has to load for a set of kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachPlan {
	pub attach_points: Vec<AttachPoint>,
	pub routes: Vec<ControlFlowEdge>,
	pub selectors: Vec<Selector>,
}

impl AttachPlan {
	/// Baseline dispatcher first, then each requested kind in registration order.
	pub fn assemble(events: &EventTypeSet) -> Self {
		let mut plan = Self::default();
		plan.add_point(AttachPoint::tracepoint(SYS_EXIT, "raw_syscalls/sys_exit"));
		plan.add_selector(Selector::AllOf(vec![SYS_EXIT]));

		for kind in EventType::supported().filter(|kind| events.contains(*kind)) {
			contribute(kind, &mut plan);
		}

		debug!(
			points = plan.attach_points.len(),
			routes = plan.routes.len(),
			selectors = plan.selectors.len(),
			events = %events,
			"attach plan assembled"
		);
		plan
	}

	pub fn point(&self, id: &str) -> Option<&AttachPoint> {
		self.attach_points.iter().find(|point| point.id == id)
	}

	/// True when no selector references `id`; such points may fail to attach.
	pub fn is_optional(&self, id: &str) -> bool {
		!self.selectors.iter().any(|selector| selector.ids().contains(&id))
	}

	/// First selector the attached set does not satisfy, if any.
	pub fn unsatisfied(&self, attached: &HashSet<&str>) -> Option<&Selector> {
		self.selectors.iter().find(|selector| !selector.is_satisfied(attached))
	}

	fn add_point(&mut self, point: AttachPoint) {
		if !self.attach_points.contains(&point) {
			self.attach_points.push(point);
		}
	}

	fn add_route(&mut self, route: ControlFlowEdge) {
		if !self.routes.contains(&route) {
			self.routes.push(route);
		}
	}

	fn add_selector(&mut self, selector: Selector) {
		if !self.selectors.contains(&selector) {
			self.selectors.push(selector);
		}
	}
}

// endregion: --- AttachPlan

// region:    --- Catalog

fn contribute(kind: EventType, plan: &mut AttachPlan) {
	match kind {
		EventType::Unknown => {}
		EventType::InitModule => {
			plan.add_point(AttachPoint::tracepoint("sys_enter_init_module", "syscalls/sys_enter_init_module"));
			plan.add_point(AttachPoint::tracepoint("sys_enter_finit_module", "syscalls/sys_enter_finit_module"));
			plan.add_point(AttachPoint::kprobe("kprobe_do_init_module", "do_init_module"));
			plan.add_route(ControlFlowEdge::from_sys_exit(wire::SYS_EXIT_INIT_MODULE_KEY, "sys_exit_init_module"));
			plan.add_selector(Selector::AllOf(vec!["sys_enter_init_module", "sys_enter_finit_module"]));
		}
		EventType::DeleteModule => {
			plan.add_point(AttachPoint::tracepoint("sys_enter_delete_module", "syscalls/sys_enter_delete_module"));
			plan.add_point(AttachPoint::kprobe("kprobe_free_module", "free_module"));
			plan.add_route(ControlFlowEdge::from_sys_exit(wire::SYS_EXIT_DELETE_MODULE_KEY, "sys_exit_delete_module"));
			plan.add_selector(Selector::AllOf(vec!["sys_enter_delete_module"]));
		}
		EventType::Bpf => {
			plan.add_point(AttachPoint::tracepoint("sys_enter_bpf", "syscalls/sys_enter_bpf"));
			plan.add_point(AttachPoint::kprobe("kprobe_security_bpf_prog", "security_bpf_prog"));
			plan.add_point(AttachPoint::kprobe("kprobe_security_bpf_map", "security_bpf_map"));
			// helper bitmask; inlined on some kernels
			plan.add_point(AttachPoint::kprobe("kprobe_check_helper_call", "check_helper_call"));
			plan.add_route(ControlFlowEdge::from_sys_exit(wire::SYS_EXIT_BPF_KEY, "sys_exit_bpf"));
			plan.add_selector(Selector::AllOf(vec![
				"sys_enter_bpf",
				"kprobe_security_bpf_prog",
				"kprobe_security_bpf_map",
			]));
		}
		EventType::BpfFilter => {
			plan.add_point(AttachPoint::tracepoint("sys_enter_setsockopt", "syscalls/sys_enter_setsockopt"));
			plan.add_point(AttachPoint::kprobe("kprobe_sk_attach_filter", "sk_attach_filter"));
			plan.add_point(AttachPoint::kprobe("kprobe_sk_attach_bpf", "sk_attach_bpf"));
			plan.add_route(ControlFlowEdge::from_sys_exit(wire::SYS_EXIT_SETSOCKOPT_KEY, "sys_exit_setsockopt"));
			plan.add_selector(Selector::AllOf(vec!["sys_enter_setsockopt"]));
			plan.add_selector(Selector::OneOf(vec!["kprobe_sk_attach_filter", "kprobe_sk_attach_bpf"]));
		}
		EventType::Ptrace => {
			plan.add_point(AttachPoint::tracepoint("sys_enter_ptrace", "syscalls/sys_enter_ptrace"));
			plan.add_point(AttachPoint::kprobe("kprobe_ptrace_check_attach", "ptrace_check_attach"));
			plan.add_route(ControlFlowEdge::from_sys_exit(wire::SYS_EXIT_PTRACE_KEY, "sys_exit_ptrace"));
			plan.add_selector(Selector::AllOf(vec!["sys_enter_ptrace"]));
		}
		EventType::Kprobe => {
			plan.add_point(AttachPoint::kprobe("kprobe_register_kprobe", "register_kprobe"));
			plan.add_point(AttachPoint::kretprobe("kretprobe_register_kprobe", "register_kprobe"));
			plan.add_point(AttachPoint::kprobe("kprobe_unregister_kprobe", "unregister_kprobe"));
			plan.add_point(AttachPoint::kprobe("kprobe_arm_kprobe", "arm_kprobe"));
			plan.add_point(AttachPoint::kprobe("kprobe_disarm_kprobe", "disarm_kprobe"));
			plan.add_selector(Selector::AllOf(vec![
				"kprobe_register_kprobe",
				"kretprobe_register_kprobe",
				"kprobe_unregister_kprobe",
			]));
		}
		EventType::SysCtl => {
			plan.add_point(AttachPoint::kprobe("kprobe_proc_sys_call_handler", "proc_sys_call_handler"));
			plan.add_point(AttachPoint::kretprobe("kretprobe_proc_sys_call_handler", "proc_sys_call_handler"));
			plan.add_selector(Selector::AllOf(vec![
				"kprobe_proc_sys_call_handler",
				"kretprobe_proc_sys_call_handler",
			]));
		}
	}
}

// endregion: --- Catalog

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	fn fx_set(names: &str) -> Result<EventTypeSet> {
		Ok(names.parse::<EventTypeSet>()?)
	}

	fn ids(plan: &AttachPlan) -> Vec<&'static str> {
		plan.attach_points.iter().map(|point| point.id).collect()
	}

	#[test]
	fn assemble_is_deterministic() -> Result<()> {
		let fx_events = fx_set("ptrace,bpf,sysctl")?;

		let first = AttachPlan::assemble(&fx_events);
		let second = AttachPlan::assemble(&fx_events);

		assert_eq!(first, second);
		assert_eq!(serde_json::to_vec(&first)?, serde_json::to_vec(&second)?);
		Ok(())
	}

	#[test]
	fn assemble_follows_registration_order() -> Result<()> {
		let plan = AttachPlan::assemble(&fx_set("ptrace,bpf")?);

		let bpf_pos = ids(&plan).iter().position(|id| *id == "sys_enter_bpf");
		let ptrace_pos = ids(&plan).iter().position(|id| *id == "sys_enter_ptrace");

		assert_eq!(Some(SYS_EXIT), ids(&plan).first().copied());
		assert!(bpf_pos < ptrace_pos);
		Ok(())
	}

	#[test]
	fn assemble_bpf_and_ptrace_only() -> Result<()> {
		// -- Exec
		let plan = AttachPlan::assemble(&fx_set("bpf,ptrace")?);
		let ids = ids(&plan);

		// -- Check
		assert!(ids.contains(&SYS_EXIT));
		for id in ["sys_enter_bpf", "kprobe_security_bpf_prog", "sys_enter_ptrace", "kprobe_ptrace_check_attach"] {
			assert!(ids.contains(&id), "missing {id}");
		}
		for id in ["kprobe_proc_sys_call_handler", "kprobe_register_kprobe", "sys_enter_init_module"] {
			assert!(!ids.contains(&id), "unexpected {id}");
		}
		let routes: Vec<&str> = plan.routes.iter().map(|r| r.program).collect();
		assert_eq!(vec!["sys_exit_bpf", "sys_exit_ptrace"], routes);
		assert_eq!(Some(&Selector::AllOf(vec![SYS_EXIT])), plan.selectors.first());
		Ok(())
	}

	#[test]
	fn assemble_empty_set_selects_everything() -> Result<()> {
		let unrestricted = AttachPlan::assemble(&EventTypeSet::new());
		let explicit = AttachPlan::assemble(&EventType::supported().collect());

		assert_eq!(explicit, unrestricted);
		for kind in EventType::supported() {
			let only = AttachPlan::assemble(&[kind].into_iter().collect());
			for point in only.attach_points {
				assert!(unrestricted.attach_points.contains(&point), "{point} missing for {kind}");
			}
		}
		Ok(())
	}

	#[test]
	fn catalog_covers_every_kind() -> Result<()> {
		let baseline = AttachPlan::assemble(&EventTypeSet::new()).attach_points.len();
		let mut seen = HashSet::new();

		for kind in EventType::supported() {
			let plan = AttachPlan::assemble(&[kind].into_iter().collect());
			assert!(plan.attach_points.len() > 1, "{kind} has no attach points");
			assert!(plan.selectors.len() > 1, "{kind} has no selector");
			for point in plan.attach_points.iter().skip(1) {
				assert!(seen.insert(point.id), "{} shared between kinds", point.id);
			}
			for selector in &plan.selectors {
				for id in selector.ids() {
					assert!(plan.point(id).is_some(), "{selector} references unknown {id}");
				}
			}
		}
		assert_eq!(baseline, seen.len() + 1);
		Ok(())
	}

	#[test]
	fn selectors_check_attached_points() -> Result<()> {
		// -- Setup & Fixtures
		let plan = AttachPlan::assemble(&fx_set("bpf_filter")?);
		let mut fx_attached: HashSet<&str> = ["sys_exit", "sys_enter_setsockopt"].into_iter().collect();

		// -- Exec & Check
		assert_eq!(
			Some(&Selector::OneOf(vec!["kprobe_sk_attach_filter", "kprobe_sk_attach_bpf"])),
			plan.unsatisfied(&fx_attached)
		);
		fx_attached.insert("kprobe_sk_attach_bpf");
		assert_eq!(None, plan.unsatisfied(&fx_attached));
		assert!(!plan.is_optional("kprobe_sk_attach_filter"));
		assert!(AttachPlan::assemble(&fx_set("bpf")?).is_optional("kprobe_check_helper_call"));
		Ok(())
	}

	#[test]
	fn tracepoint_targets_split() -> Result<()> {
		let plan = AttachPlan::assemble(&fx_set("ptrace")?);

		let sys_exit = plan.point(SYS_EXIT).ok_or("no sys_exit")?;
		let kprobe = plan.point("kprobe_ptrace_check_attach").ok_or("no kprobe")?;

		assert_eq!(Some(("raw_syscalls", "sys_exit")), sys_exit.tracepoint_parts());
		assert_eq!(None, kprobe.tracepoint_parts());
		Ok(())
	}
}

// endregion: --- Tests
