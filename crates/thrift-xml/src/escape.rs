//! Escaping of text payloads.
//!
//! Only `&` and `<` are escaped. Everything else, `>` and `"` included, is
//! written verbatim.

use std::io::{Read, Write};

use crate::error::{ProtocolError, Result};
use crate::reader::LookaheadReader;

const AMP_ESCAPE: &[u8] = b"&amp;";
const LT_ESCAPE: &[u8] = b"&lt;";

/// Writes `text` with `&` and `<` escaped.
pub fn write_escaped<W: Write>(writer: &mut W, text: &[u8]) -> Result<()> {
    let mut start = 0;
    for (index, &byte) in text.iter().enumerate() {
        let escape = match byte {
            b'&' => AMP_ESCAPE,
            b'<' => LT_ESCAPE,
            _ => continue,
        };
        writer.write_all(&text[start..index])?;
        writer.write_all(escape)?;
        start = index + 1;
    }
    writer.write_all(&text[start..])?;
    Ok(())
}

/// Returns `text` with `&` and `<` escaped.
#[must_use]
pub fn escape(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &byte in text {
        match byte {
            b'&' => out.extend_from_slice(AMP_ESCAPE),
            b'<' => out.extend_from_slice(LT_ESCAPE),
            _ => out.push(byte),
        }
    }
    out
}

/// Decodes the remainder of an escape whose leading `&` was already consumed.
pub fn read_escape_tail<R: Read>(reader: &mut LookaheadReader<R>) -> Result<u8> {
    let (tail, decoded): (&[u8], u8) = match reader.read()? {
        b'a' => (b"mp;", b'&'),
        b'l' => (b"t;", b'<'),
        other => {
            return Err(ProtocolError::InvalidEscape(format!(
                "unexpected {:?} after '&'",
                char::from(other)
            )))
        }
    };
    for &wanted in tail {
        let byte = reader.read()?;
        if byte != wanted {
            return Err(ProtocolError::InvalidEscape(format!(
                "unexpected {:?} in escape sequence",
                char::from(byte)
            )));
        }
    }
    Ok(decoded)
}

/// Reads free text up to, but not including, the next raw `<`.
///
/// `limit` bounds the decoded length.
pub fn read_text<R: Read>(reader: &mut LookaheadReader<R>, limit: Option<usize>) -> Result<Vec<u8>> {
    let mut text = Vec::new();
    loop {
        if reader.peek()? == b'<' {
            return Ok(text);
        }
        let byte = match reader.read()? {
            b'&' => read_escape_tail(reader)?,
            byte => byte,
        };
        text.push(byte);
        check_limit(text.len(), limit)?;
    }
}

/// Reads markup text (a tag name or attribute value) up to a terminator.
///
/// The terminator is consumed and returned alongside the decoded text. A raw
/// `<` is an error here since markup never nests.
pub fn read_markup_text<R: Read>(
    reader: &mut LookaheadReader<R>,
    terminators: &[u8],
) -> Result<(Vec<u8>, u8)> {
    let mut text = Vec::new();
    loop {
        let byte = reader.read()?;
        if terminators.contains(&byte) {
            return Ok((text, byte));
        }
        let byte = match byte {
            b'&' => read_escape_tail(reader)?,
            b'<' => {
                return Err(ProtocolError::InvalidEscape(
                    "raw '<' inside markup".to_owned(),
                ))
            }
            byte => byte,
        };
        text.push(byte);
    }
}

fn check_limit(len: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(max) if len > max => Err(ProtocolError::SizeLimit {
            what: "string",
            size: len,
            max,
        }),
        _ => Ok(()),
    }
}
