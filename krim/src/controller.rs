use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
	config::Options,
	error::{Error, Result},
	events::{Event, TimeResolver},
	handler::{DefaultHandler, EventHandler},
	probes::AttachPlan,
	runtime::{CleanupMode, Delivery, InstrumentationRuntime},
	sink::JsonSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrimState {
	Created,
	Started,
	/// Terminal.
	Stopped,
}

/// decode -> handle, run by every runtime worker with its own scratch event.
pub struct Pipeline {
	resolver: Arc<dyn TimeResolver>,
	handler: Arc<dyn EventHandler>,
}

impl Pipeline {
	pub fn new(resolver: Arc<dyn TimeResolver>, handler: Arc<dyn EventHandler>) -> Self {
		Self { resolver, handler }
	}
}

impl Delivery for Pipeline {
	fn deliver(&self, scratch: &mut Event, data: &[u8]) -> Result<()> {
		scratch.decode_into(data, self.resolver.as_ref())?;
		self.handler.handle(scratch)
	}
}

/// Runtime controller: owns the options, the output sink and the instrumentation runtime.
pub struct Krim<R: InstrumentationRuntime> {
	options: Options,
	runtime: R,
	resolver: Arc<dyn TimeResolver>,
	handler: Option<Arc<dyn EventHandler>>,
	cleanup_mode: CleanupMode,
	sink: Option<Arc<JsonSink>>,
	state: KrimState,
}

impl<R: InstrumentationRuntime> Krim<R> {
	/// Fails on invalid options, before anything touches the kernel.
	pub fn new(options: Options, runtime: R, resolver: impl TimeResolver + 'static) -> Result<Self> {
		options.validate()?;

		Ok(Self {
			options,
			runtime,
			resolver: Arc::new(resolver),
			handler: None,
			cleanup_mode: CleanupMode::default(),
			sink: None,
			state: KrimState::Created,
		})
	}

	/// Replaces the default JSON handler.
	pub fn with_handler(mut self, handler: impl EventHandler + 'static) -> Self {
		self.handler = Some(Arc::new(handler));
		self
	}

	pub fn with_cleanup_mode(mut self, cleanup_mode: CleanupMode) -> Self {
		self.cleanup_mode = cleanup_mode;
		self
	}

	pub fn state(&self) -> KrimState {
		self.state
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	pub fn runtime(&self) -> &R {
		&self.runtime
	}

	pub fn sink(&self) -> Option<&Arc<JsonSink>> {
		self.sink.as_ref()
	}

	pub fn start(&mut self) -> Result<()> {
		match self.state {
			KrimState::Created => {}
			KrimState::Started => return Err(Error::AlreadyStarted),
			KrimState::Stopped => return Err(Error::AlreadyStopped),
		}
		self.options.validate()?;

		let plan = AttachPlan::assemble(&self.options.events);
		info!(
			events = %self.options.events,
			points = plan.attach_points.len(),
			routes = plan.routes.len(),
			"starting"
		);

		let sink = match &self.options.output {
			Some(path) => Some(Arc::new(JsonSink::create(path)?)),
			None => None,
		};
		let handler = match &self.handler {
			Some(handler) => handler.clone(),
			None => Arc::new(DefaultHandler::new(sink.clone())),
		};
		let pipeline = Arc::new(Pipeline::new(self.resolver.clone(), handler));

		let res = self.runtime.configure(plan).and_then(|_| self.runtime.start(pipeline));
		if let Err(err) = res {
			if let Some(sink) = sink {
				if let Err(close_err) = sink.close() {
					warn!("closing sink after failed start: {close_err}");
				}
			}
			return Err(err);
		}

		self.sink = sink;
		self.state = KrimState::Started;
		info!("started");
		Ok(())
	}

	/// Best effort: runtime teardown and sink close are both attempted, failures are logged.
	/// A no-op unless started.
	pub fn stop(&mut self) {
		match self.state {
			KrimState::Started => {}
			KrimState::Created => {
				debug!("stop requested before start");
				return;
			}
			KrimState::Stopped => return,
		}

		if let Err(err) = self.runtime.stop(self.cleanup_mode) {
			warn!("failed to stop instrumentation runtime: {err}");
		}
		if let Some(sink) = self.sink.take() {
			if let Err(err) = sink.close() {
				warn!(path = %sink.path().display(), "failed to close output sink: {err}");
			}
			if sink.write_failures() > 0 {
				warn!(failures = sink.write_failures(), "events were lost writing the output sink");
			}
		}

		self.state = KrimState::Stopped;
		info!("stopped");
	}
}

impl<R: InstrumentationRuntime> Drop for Krim<R> {
	fn drop(&mut self) {
		self.stop();
	}
}

// region:    --- Tests


// endregion: --- Tests
