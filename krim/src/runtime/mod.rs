//! Seam between the control plane and whatever loads, attaches and polls the kernel programs.

// region:    --- Modules

mod aya_runtime;

pub use aya_runtime::AyaRuntime;

// endregion: --- Modules

use std::sync::Arc;

use crate::{
	error::Result,
	events::Event,
	probes::AttachPlan,
};

/// What `stop` releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupMode {
	/// Detach and unload programs, keep maps around.
	DetachPrograms,
	/// Release programs, maps and the loaded object.
	#[default]
	CleanAll,
}

/// Receives raw records from the runtime.
///
/// Called concurrently from one worker per CPU. `scratch` belongs to the calling worker and is
/// never shared, so implementations may decode straight into it.
pub trait Delivery: Send + Sync {
	fn deliver(&self, scratch: &mut Event, data: &[u8]) -> Result<()>;
}

pub trait InstrumentationRuntime: Send {
	fn configure(&mut self, plan: AttachPlan) -> Result<()>;

	fn start(&mut self, delivery: Arc<dyn Delivery>) -> Result<()>;

	/// Once this returns no further buffers are delivered.
	fn stop(&mut self, mode: CleanupMode) -> Result<()>;
}
