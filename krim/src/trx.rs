use flume::{Receiver, Sender, TryRecvError};

use crate::{
	error::{Error, Result},
	events::Event,
	handler::EventHandler,
};

/// Forwards owned copies of decoded events to an async consumer.
///
/// Never blocks the delivery pipeline: when the channel is full the event is dropped and the
/// handler reports `ChannelFull`.
#[derive(Clone)]
pub struct ChannelHandler {
	tx: Sender<Event>,
}

impl EventHandler for ChannelHandler {
	fn handle(&self, event: &Event) -> Result<()> {
		self.tx.try_send(event.clone())?;
		Ok(())
	}
}

pub struct EventRx {
	rx: Receiver<Event>,
}

impl EventRx {
	pub async fn recv(&self) -> Result<Event> {
		let res = self.rx.recv_async().await?;
		Ok(res)
	}

	/// `None` when nothing is queued.
	pub fn try_recv(&self) -> Result<Option<Event>> {
		match self.rx.try_recv() {
			Ok(event) => Ok(Some(event)),
			Err(TryRecvError::Empty) => Ok(None),
			Err(TryRecvError::Disconnected) => Err(Error::ChannelClosed),
		}
	}

	pub fn len(&self) -> usize {
		self.rx.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}
}

pub fn new_channel(capacity: usize) -> (ChannelHandler, EventRx) {
	let (tx, rx) = flume::bounded::<Event>(capacity);

	(ChannelHandler { tx }, EventRx { rx })
}

// region:    --- Tests


// endregion: --- Tests
