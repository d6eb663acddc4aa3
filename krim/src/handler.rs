use std::sync::Arc;

use tracing::debug;

use crate::{
	error::Result,
	events::{to_json_line, Event},
	sink::JsonSink,
};

/// Consumes decoded events. Shared by every per-CPU worker, so it is called concurrently.
pub trait EventHandler: Send + Sync {
	fn handle(&self, event: &Event) -> Result<()>;
}

impl<F> EventHandler for F
where
	F: Fn(&Event) -> Result<()> + Send + Sync,
{
	fn handle(&self, event: &Event) -> Result<()> {
		self(event)
	}
}

/// Writes one JSON line per event to the sink, when there is one, and traces it at `debug`.
#[derive(Debug, Clone, Default)]
pub struct DefaultHandler {
	sink: Option<Arc<JsonSink>>,
}

impl DefaultHandler {
	pub fn new(sink: Option<Arc<JsonSink>>) -> Self {
		Self { sink }
	}

	pub fn sink(&self) -> Option<&Arc<JsonSink>> {
		self.sink.as_ref()
	}
}

impl EventHandler for DefaultHandler {
	fn handle(&self, event: &Event) -> Result<()> {
		let line = to_json_line(event)?;
		if let Some(sink) = &self.sink {
			sink.write_line(&line)?;
		}
		debug!("{}", String::from_utf8_lossy(&line).trim_end());
		Ok(())
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::error::Error;
	use crate::events::fixtures::{self, FxKind};
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn default_handler_without_sink() -> Result<()> {
		let handler = DefaultHandler::default();
		let event = Event::decode(&FxKind::Bpf.buffer(), &fixtures::resolver())?;

		handler.handle(&event)?;

		assert!(handler.sink().is_none());
		assert!(handler.handle(&Event::new()).is_err());
		Ok(())
	}

	#[test]
	fn default_handler_reports_closed_sink() -> Result<()> {
		// -- Setup & Fixtures
		let fx_dir = tempfile::tempdir()?;
		let sink = Arc::new(JsonSink::create(fx_dir.path().join("events.json"))?);
		let handler = DefaultHandler::new(Some(sink.clone()));
		let event = Event::decode(&FxKind::Ptrace.buffer(), &fixtures::resolver())?;

		// -- Exec
		handler.handle(&event)?;
		sink.close()?;
		let res = handler.handle(&event);

		// -- Check
		assert!(matches!(res, Err(Error::SinkClosed)));
		Ok(())
	}

	#[test]
	fn closures_are_handlers() -> Result<()> {
		let seen = AtomicUsize::new(0);
		let handler = |event: &Event| {
			assert!(event.is_complete());
			seen.fetch_add(1, Ordering::Relaxed);
			Ok::<(), Error>(())
		};

		handler.handle(&Event::decode(&FxKind::Kprobe.buffer(), &fixtures::resolver())?)?;

		assert_eq!(1, seen.load(Ordering::Relaxed));
		Ok(())
	}
}

// endregion: --- Tests
