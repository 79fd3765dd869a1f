//! Transport boundary.
//!
//! The protocol only needs blocking `read_exact` and `write_all`, so any
//! `std::io::Read + Write` type works as a transport: sockets, pipes, files,
//! or the in-memory [`MemoryBuffer`].

use std::io::{self, Read, Write};

/// A bidirectional blocking byte channel.
pub trait Transport: Read + Write {}

impl<T: Read + Write + ?Sized> Transport for T {}

/// In-memory transport: writes append, reads consume from the front.
///
/// Useful for loopback tests and for encoding a message to bytes before
/// handing it to a framed transport.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryBuffer {
    data: Vec<u8>,
    position: usize,
}

impl MemoryBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer whose unread contents are `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: bytes.into(),
            position: 0,
        }
    }

    /// Returns the bytes not yet read.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.position..]
    }

    /// Returns everything written so far, read or not.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Discards all contents.
    pub fn clear(&mut self) {
        self.data.clear();
        self.position = 0;
    }
}

impl Read for MemoryBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.unread().read(buf)?;
        self.position += count;
        Ok(count)
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
