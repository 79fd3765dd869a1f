//! One-byte lookahead over a blocking transport.

use std::io::Read;

use crate::error::{ProtocolError, Result};

/// Wraps a transport with a single byte of pushback.
///
/// `peek` followed by `read` yields the same byte; `read` without a prior
/// `peek` consumes fresh input. The wrapper also owns the transport for the
/// write path, which never touches the buffered byte.
#[derive(Debug)]
pub struct LookaheadReader<T> {
    inner: T,
    buffered: Option<u8>,
}

impl<T> LookaheadReader<T> {
    /// Creates a reader with an empty lookahead buffer.
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            buffered: None,
        }
    }

    /// Drops any buffered byte.
    pub fn clear(&mut self) {
        self.buffered = None;
    }

    /// Checks if a byte is currently buffered.
    #[must_use]
    pub const fn has_buffered(&self) -> bool {
        self.buffered.is_some()
    }

    pub const fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> LookaheadReader<T> {
    /// Consumes and returns the next byte.
    pub fn read(&mut self) -> Result<u8> {
        match self.buffered.take() {
            Some(byte) => Ok(byte),
            None => self.fill(),
        }
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&mut self) -> Result<u8> {
        match self.buffered {
            Some(byte) => Ok(byte),
            None => {
                let byte = self.fill()?;
                self.buffered = Some(byte);
                Ok(byte)
            }
        }
    }

    /// Consumes bytes that must match `literal` exactly.
    pub fn expect(&mut self, literal: &[u8]) -> Result<()> {
        for (index, &wanted) in literal.iter().enumerate() {
            let byte = self.read()?;
            if byte != wanted {
                let mut found = literal[..index].to_vec();
                found.push(byte);
                return Err(ProtocolError::malformed(
                    String::from_utf8_lossy(literal),
                    String::from_utf8_lossy(&found),
                ));
            }
        }
        Ok(())
    }

    fn fill(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}
