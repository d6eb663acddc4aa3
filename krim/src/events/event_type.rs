use std::{collections::HashMap, fmt, str::FromStr, sync::LazyLock};

use krim_common as wire;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::{Error, Result};

/// Kinds of events the kernel side can report. Declaration order is the registration order
/// used everywhere a stable ordering over kinds is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum EventType {
	#[default]
	Unknown,
	InitModule,
	DeleteModule,
	Bpf,
	BpfFilter,
	Ptrace,
	Kprobe,
	SysCtl,
}

// Older configuration files name the socket filter kind `bpf_event`.
const NAME_ALIASES: [(&str, EventType); 1] = [("bpf_event", EventType::BpfFilter)];

static NAME_TO_TYPE: LazyLock<HashMap<&'static str, EventType>> = LazyLock::new(|| {
	EventType::iter()
		.filter(|kind| *kind != EventType::Unknown)
		.map(|kind| (kind.as_str(), kind))
		.chain(NAME_ALIASES)
		.collect()
});

impl EventType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unknown => "unknown",
			Self::InitModule => "init_module",
			Self::DeleteModule => "delete_module",
			Self::Bpf => "bpf",
			Self::BpfFilter => "bpf_filter",
			Self::Ptrace => "ptrace",
			Self::Kprobe => "kprobe",
			Self::SysCtl => "sysctl",
		}
	}

	/// Every kind that can be requested, in registration order.
	pub fn supported() -> impl Iterator<Item = EventType> {
		Self::iter().filter(|kind| *kind != Self::Unknown)
	}

	/// Maps a wire discriminant. `0` and anything past the catalog are rejected.
	pub fn from_discriminant(value: u32) -> Result<Self> {
		let kind = match value {
			wire::EVENT_INIT_MODULE => Self::InitModule,
			wire::EVENT_DELETE_MODULE => Self::DeleteModule,
			wire::EVENT_BPF => Self::Bpf,
			wire::EVENT_BPF_FILTER => Self::BpfFilter,
			wire::EVENT_PTRACE => Self::Ptrace,
			wire::EVENT_KPROBE => Self::Kprobe,
			wire::EVENT_SYSCTL => Self::SysCtl,
			other => return Err(Error::UnknownEventType(other)),
		};
		Ok(kind)
	}

	pub fn discriminant(self) -> u32 {
		match self {
			Self::Unknown => wire::EVENT_UNKNOWN,
			Self::InitModule => wire::EVENT_INIT_MODULE,
			Self::DeleteModule => wire::EVENT_DELETE_MODULE,
			Self::Bpf => wire::EVENT_BPF,
			Self::BpfFilter => wire::EVENT_BPF_FILTER,
			Self::Ptrace => wire::EVENT_PTRACE,
			Self::Kprobe => wire::EVENT_KPROBE,
			Self::SysCtl => wire::EVENT_SYSCTL,
		}
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EventType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		NAME_TO_TYPE
			.get(s.trim())
			.copied()
			.ok_or_else(|| Error::UnknownEventTypeName(s.to_string()))
	}
}

impl Serialize for EventType {
	fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

// region:    --- EventTypeSet

/// Ordered set of requested kinds. An empty set is unrestricted: it contains every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTypeSet {
	kinds: Vec<EventType>,
}

impl EventTypeSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, kind: EventType) {
		if !self.kinds.contains(&kind) {
			self.kinds.push(kind);
		}
	}

	pub fn contains(&self, kind: EventType) -> bool {
		self.kinds.is_empty() || self.kinds.contains(&kind)
	}

	pub fn is_unrestricted(&self) -> bool {
		self.kinds.is_empty()
	}

	pub fn len(&self) -> usize {
		self.kinds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.kinds.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = EventType> + '_ {
		self.kinds.iter().copied()
	}

	pub fn validate(&self) -> Result<()> {
		if self.kinds.contains(&EventType::Unknown) {
			return Err(Error::UnknownEventTypeName(EventType::Unknown.to_string()));
		}
		Ok(())
	}
}

impl FromIterator<EventType> for EventTypeSet {
	fn from_iter<I: IntoIterator<Item = EventType>>(iter: I) -> Self {
		let mut set = Self::new();
		for kind in iter {
			set.insert(kind);
		}
		set
	}
}

impl fmt::Display for EventTypeSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, kind) in self.kinds.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			f.write_str(kind.as_str())?;
		}
		Ok(())
	}
}

/// Parses a comma separated list such as `bpf,ptrace`.
impl FromStr for EventTypeSet {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		s.split(',')
			.filter(|name| !name.trim().is_empty())
			.map(EventType::from_str)
			.collect()
	}
}

impl Serialize for EventTypeSet {
	fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
		serializer.collect_seq(self.kinds.iter())
	}
}

impl<'de> Deserialize<'de> for EventTypeSet {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
		let names = Vec::<String>::deserialize(deserializer)?;
		names
			.iter()
			.map(|name| name.parse::<EventType>())
			.collect::<Result<EventTypeSet>>()
			.map_err(|_| {
				let unknown = names
					.iter()
					.find(|name| name.parse::<EventType>().is_err())
					.map(String::as_str)
					.unwrap_or_default();
				de::Error::custom(format!("unknown event type: {unknown}"))
			})
	}
}

// endregion: --- EventTypeSet

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn event_type_names_round_trip() -> Result<()> {
		for kind in EventType::supported() {
			assert!(!kind.as_str().is_empty());
			assert_eq!(kind, kind.as_str().parse::<EventType>()?);
			assert_eq!(kind, EventType::from_discriminant(kind.discriminant())?);
		}
		Ok(())
	}

	#[test]
	fn event_type_rejects_unknown_names_and_discriminants() -> Result<()> {
		assert!(matches!("unknown".parse::<EventType>(), Err(Error::UnknownEventTypeName(_))));
		assert!(matches!("execve".parse::<EventType>(), Err(Error::UnknownEventTypeName(_))));
		assert!(matches!(EventType::from_discriminant(0), Err(Error::UnknownEventType(0))));
		assert!(matches!(EventType::from_discriminant(8), Err(Error::UnknownEventType(8))));
		Ok(())
	}

	#[test]
	fn event_type_accepts_legacy_alias() -> Result<()> {
		// -- Exec
		let fx_set: EventTypeSet = "bpf_event,ptrace".parse()?;

		// -- Check
		assert_eq!(EventType::BpfFilter, "bpf_event".parse::<EventType>()?);
		assert_eq!("bpf_filter", EventType::BpfFilter.to_string());
		assert_eq!("bpf_filter,ptrace", fx_set.to_string());
		Ok(())
	}

	#[test]
	fn empty_set_contains_everything() -> Result<()> {
		// -- Setup & Fixtures
		let fx_set = EventTypeSet::new();

		// -- Check
		assert!(fx_set.is_unrestricted());
		for kind in EventType::iter() {
			assert!(fx_set.contains(kind));
		}
		Ok(())
	}

	#[test]
	fn non_empty_set_contains_only_members() -> Result<()> {
		// -- Setup & Fixtures
		let fx_set: EventTypeSet = "bpf,ptrace".parse()?;

		// -- Check
		for kind in EventType::iter() {
			assert_eq!(matches!(kind, EventType::Bpf | EventType::Ptrace), fx_set.contains(kind));
		}
		Ok(())
	}

	#[test]
	fn insert_is_idempotent() -> Result<()> {
		// -- Setup & Fixtures
		let mut once = EventTypeSet::new();
		once.insert(EventType::Kprobe);
		once.insert(EventType::SysCtl);

		// -- Exec
		let mut twice = once.clone();
		twice.insert(EventType::Kprobe);

		// -- Check
		assert_eq!(once.len(), twice.len());
		assert_eq!(once.to_string(), twice.to_string());
		assert_eq!("kprobe,sysctl", twice.to_string());
		Ok(())
	}

	#[test]
	fn set_validation_rejects_unknown_member() -> Result<()> {
		let mut fx_set = EventTypeSet::new();
		fx_set.insert(EventType::Bpf);
		fx_set.insert(EventType::Unknown);
		assert!(fx_set.validate().is_err());
		Ok(())
	}

	#[test]
	fn set_deserializes_from_toml_list() -> Result<()> {
		#[derive(Deserialize)]
		struct Fx {
			events: EventTypeSet,
		}

		// -- Exec
		let fx: Fx = toml::from_str(r#"events = ["ptrace", "bpf", "ptrace"]"#)?;
		let bad = toml::from_str::<Fx>(r#"events = ["ptrace", "bogus"]"#);

		// -- Check
		assert_eq!("ptrace,bpf", fx.events.to_string());
		let err = bad.err().ok_or("unknown name accepted")?;
		assert!(err.to_string().contains("bogus"));
		Ok(())
	}
}

// endregion: --- Tests
