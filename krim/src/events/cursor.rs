use std::mem::size_of;

use zerocopy::FromBytes;

use crate::error::{Error, Result};

/// Bounds-checked reader over one kernel buffer. Every read validates against the remaining
/// length before touching the data, and a failed read never moves the position.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	data: &'a [u8],
	position: usize,
}

impl<'a> Cursor<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, position: 0 }
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.position
	}

	fn rest(&self) -> &'a [u8] {
		&self.data[self.position..]
	}

	/// Copies a fixed-layout record out of the buffer.
	pub fn read<T: FromBytes>(&mut self) -> Result<T> {
		let (value, _) = T::read_from_prefix(self.rest()).map_err(|_| Error::TruncatedBuffer {
			needed: size_of::<T>(),
			available: self.remaining(),
		})?;
		self.position += size_of::<T>();
		Ok(value)
	}

	/// Borrows a length-prefixed trailer. The length comes from the buffer itself, so an
	/// overrun is a malformed field rather than a short read.
	pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
		if len > self.remaining() {
			return Err(Error::malformed(
				field,
				format!("declared length {len} exceeds remaining {}", self.remaining()),
			));
		}
		let bytes = &self.rest()[..len];
		self.position += len;
		Ok(bytes)
	}

	/// Runs `f` and rewinds to the starting position if it fails.
	pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let start = self.position;
		let res = f(self);
		if res.is_err() {
			self.position = start;
		}
		res
	}
}

/// Reads a NUL-terminated kernel char array.
pub fn c_string(bytes: &[u8]) -> String {
	let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
	String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Reads a length-prefixed kernel string, dropping any trailing NULs the producer kept.
pub fn sized_string(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
}

pub fn check_limit(field: &'static str, len: usize, max: usize) -> Result<()> {
	if len > max {
		return Err(Error::malformed(field, format!("length {len} over limit {max}")));
	}
	Ok(())
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn cursor_read_past_end_does_not_move() -> Result<()> {
		// -- Setup & Fixtures
		let fx_data = [1u8, 0, 0, 0, 2, 0];
		let mut cursor = Cursor::new(&fx_data);

		// -- Exec
		let first: u32 = cursor.read()?;
		let second = cursor.read::<u32>();

		// -- Check
		assert_eq!(1, first);
		assert!(matches!(second, Err(Error::TruncatedBuffer { needed: 4, available: 2 })));
		assert_eq!(4, cursor.position());
		assert_eq!(2, cursor.remaining());
		Ok(())
	}

	#[test]
	fn cursor_rejects_overlong_declared_length() -> Result<()> {
		let fx_data = [b'a', b'b', b'c'];
		let mut cursor = Cursor::new(&fx_data);

		let res = cursor.read_bytes(4, "name");

		assert!(matches!(res, Err(Error::MalformedField { field: "name", .. })));
		assert_eq!(0, cursor.position());
		assert_eq!(b"abc", cursor.read_bytes(3, "name")?);
		Ok(())
	}

	#[test]
	fn cursor_transaction_rewinds_on_error() -> Result<()> {
		let fx_data = [0u8; 10];
		let mut cursor = Cursor::new(&fx_data);

		let res = cursor.transaction(|c| {
			c.read::<u64>()?;
			c.read::<u64>()
		});

		assert!(res.is_err());
		assert_eq!(0, cursor.position());
		Ok(())
	}

	#[test]
	fn c_string_stops_at_nul() {
		assert_eq!("ext4", c_string(b"ext4\0\0garbage"));
		assert_eq!("full", c_string(b"full"));
		assert_eq!("kallsyms", sized_string(b"kallsyms\0"));
	}
}

// endregion: --- Tests
