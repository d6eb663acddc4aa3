use derive_more::{Display, From};
use flume::{RecvError, TrySendError};

use crate::events::EventType;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),

	// -- Configuration
	ConfigNotFound(String),
	UnknownEventTypeName(String),
	InvalidOutputPath {
		path: String,
		reason: &'static str,
	},

	// -- Decode
	TruncatedBuffer {
		needed: usize,
		available: usize,
	},
	MalformedField {
		field: &'static str,
		reason: String,
	},
	UnknownEventType(u32),
	BadTimestamp(u64),

	// -- Serialize
	MismatchedPayload {
		kind: EventType,
		payload: EventType,
	},

	// -- Sink & handlers
	SinkClosed,
	ChannelFull,
	ChannelClosed,

	// -- Controller
	AlreadyStarted,
	AlreadyStopped,

	// -- Runtime
	NotConfigured,
	EbpfProgNotFound(String),
	EbpfMapNotFound(String),
	SelectorUnsatisfied(String),
	LockPoison,

	// -- Externals
	#[from]
	ConfigToml(toml::de::Error),
	#[from]
	Json(serde_json::Error),
	#[from]
	AyaEbpf(aya::EbpfError),
	#[from]
	AyaMaps(aya::maps::MapError),
	#[from]
	AyaProgram(aya::programs::ProgramError),
	#[from]
	PerfBuffer(aya::maps::perf::PerfBufferError),
	#[from]
	Io(std::io::Error),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
	fn from(_val: std::sync::PoisonError<T>) -> Self {
		Self::LockPoison
	}
}

impl<T> From<TrySendError<T>> for Error {
	fn from(value: TrySendError<T>) -> Self {
		match value {
			TrySendError::Full(_) => Self::ChannelFull,
			TrySendError::Disconnected(_) => Self::ChannelClosed,
		}
	}
}

impl From<RecvError> for Error {
	fn from(_val: RecvError) -> Self {
		Self::ChannelClosed
	}
}

// region:    --- Custom

impl Error {
	pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
		Self::MalformedField {
			field,
			reason: reason.into(),
		}
	}

	pub fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}

	/// Decode errors are local to one buffer and never end a session.
	pub fn is_decode(&self) -> bool {
		matches!(
			self,
			Self::TruncatedBuffer { .. } | Self::MalformedField { .. } | Self::UnknownEventType(_) | Self::BadTimestamp(_)
		)
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
