//! Numeric and binary sub-encodings.
//!
//! Integers travel as base-10 text, doubles as shortest round-trip text and
//! binary as base64 without `=` padding:
//!
//! ```text
//! 3 bytes -> 4 chars    2 bytes -> 3 chars    1 byte -> 2 chars
//! ```
//!
//! The unpadded tail is only guaranteed to agree with this codec's own
//! reader; standard base64 tooling may insist on padding.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::error::{ProtocolError, Result};
use crate::escape;
use crate::reader::LookaheadReader;

/// Writes an integer as base-10 ASCII.
pub fn write_integer<W: Write>(writer: &mut W, value: i64) -> Result<()> {
    write!(writer, "{value}")?;
    Ok(())
}

/// Writes a double as shortest round-trip text.
///
/// Non-finite values use the `NaN`, `Infinity` and `-Infinity` spellings
/// shared with the other language bindings.
pub fn write_double<W: Write>(writer: &mut W, value: f64) -> Result<()> {
    if value.is_nan() {
        writer.write_all(b"NaN")?;
    } else if value.is_infinite() {
        let text: &[u8] = if value > 0.0 { b"Infinity" } else { b"-Infinity" };
        writer.write_all(text)?;
    } else {
        write!(writer, "{value:?}")?;
    }
    Ok(())
}

/// Writes bytes as unpadded base64.
pub fn write_base64<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(STANDARD_NO_PAD.encode(bytes).as_bytes())?;
    Ok(())
}

const fn is_numeric(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E')
}

// Letters of "NaN" and "Infinity", either case.
const fn is_float_char(byte: u8) -> bool {
    is_numeric(byte)
        || matches!(
            byte.to_ascii_lowercase(),
            b'n' | b'a' | b'i' | b'f' | b't' | b'y'
        )
}

fn scan<R: Read>(reader: &mut LookaheadReader<R>, accept: fn(u8) -> bool) -> Result<String> {
    let mut text = String::new();
    while accept(reader.peek()?) {
        text.push(char::from(reader.read()?));
    }
    Ok(text)
}

/// Reads the maximal run of `[0-9+\-.eE]` characters.
pub fn read_numeric_chars<R: Read>(reader: &mut LookaheadReader<R>) -> Result<String> {
    scan(reader, is_numeric)
}

/// Reads a base-10 integer.
pub fn read_integer<R: Read>(reader: &mut LookaheadReader<R>) -> Result<i64> {
    let text = read_numeric_chars(reader)?;
    text.parse()
        .map_err(|_| ProtocolError::InvalidNumericData(text))
}

/// Reads a double, accepting the non-finite spellings.
pub fn read_double<R: Read>(reader: &mut LookaheadReader<R>) -> Result<f64> {
    let text = scan(reader, is_float_char)?;
    text.parse()
        .map_err(|_| ProtocolError::InvalidNumericData(text))
}

/// Reads escaped text and decodes it as unpadded base64.
pub fn read_base64<R: Read>(reader: &mut LookaheadReader<R>, limit: Option<usize>) -> Result<Vec<u8>> {
    let text = escape::read_text(reader, limit)?;
    Ok(STANDARD_NO_PAD.decode(text)?)
}
