//! Nesting contexts and the stack that holds them.
//!
//! Each context knows which markup belongs at its position in the document.
//! A transition is direction-agnostic: [`Context::advance`] moves the state
//! machine one step and returns the [`Step`] that must be written (on the
//! write path) or found in the input (on the read path).

use std::io::{Read, Write};

use tracing::trace;

use crate::codec;
use crate::error::{ProtocolError, Result};
use crate::escape;
use crate::reader::LookaheadReader;
use crate::types::TType;

/// Which side of the codec drives a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

/// Container header emitted before the first element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    /// Key type, for maps only.
    pub key_type: Option<TType>,
    pub value_type: TType,
    pub count: i32,
}

impl Preamble {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        if let Some(key_type) = self.key_type {
            write_element(writer, b"key_type", key_type.xml_name()?.as_bytes())?;
        }
        write_element(writer, b"val_type", self.value_type.xml_name()?.as_bytes())?;
        writer.write_all(b"<entry_count>")?;
        codec::write_integer(writer, i64::from(self.count))?;
        writer.write_all(b"</entry_count>")?;
        Ok(())
    }

    /// Consumes a preamble from the input. `with_key` selects the map form.
    pub fn read_from<R: Read>(reader: &mut LookaheadReader<R>, with_key: bool) -> Result<Self> {
        let key_type = if with_key {
            Some(read_type_element(reader, b"key_type")?)
        } else {
            None
        };
        let value_type = read_type_element(reader, b"val_type")?;
        reader.expect(b"<entry_count>")?;
        let count = codec::read_integer(reader)?;
        reader.expect(b"</entry_count>")?;

        if count < 0 {
            return Err(ProtocolError::NegativeSize(count));
        }
        let count = i32::try_from(count)
            .map_err(|_| ProtocolError::InvalidNumericData(count.to_string()))?;

        Ok(Self {
            key_type,
            value_type,
            count,
        })
    }

    fn expect_from<R: Read>(&self, reader: &mut LookaheadReader<R>) -> Result<()> {
        let found = Self::read_from(reader, self.key_type.is_some())?;
        if found != *self {
            return Err(ProtocolError::malformed(
                format!("{self:?}"),
                format!("{found:?}"),
            ));
        }
        Ok(())
    }
}

fn write_element<W: Write>(writer: &mut W, name: &[u8], text: &[u8]) -> Result<()> {
    writer.write_all(b"<")?;
    writer.write_all(name)?;
    writer.write_all(b">")?;
    writer.write_all(text)?;
    writer.write_all(b"</")?;
    writer.write_all(name)?;
    writer.write_all(b">")?;
    Ok(())
}

fn read_type_element<R: Read>(reader: &mut LookaheadReader<R>, name: &[u8]) -> Result<TType> {
    reader.expect(b"<")?;
    reader.expect(name)?;
    reader.expect(b">")?;
    let text = escape::read_text(reader, None)?;
    reader.expect(b"</")?;
    reader.expect(name)?;
    reader.expect(b">")?;
    TType::from_xml_name(&text)
}

/// Markup for a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    /// No markup at this position.
    None,
    /// `<name>`, or `<name type="T" field="id">` when typed.
    Open {
        name: &'a str,
        field: Option<(TType, i16)>,
    },
    /// `</name>`.
    Close(&'a str),
}

/// Everything a transition emits or expects, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<'a> {
    pub preamble: Option<Preamble>,
    pub tag: Tag<'a>,
}

impl<'a> Step<'a> {
    const fn tag(tag: Tag<'a>) -> Self {
        Self {
            preamble: None,
            tag,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        if let Some(preamble) = &self.preamble {
            preamble.write_to(writer)?;
        }
        match self.tag {
            Tag::None => {}
            Tag::Open { name, field } => {
                writer.write_all(b"<")?;
                writer.write_all(name.as_bytes())?;
                if let Some((field_type, id)) = field {
                    writer.write_all(b" type=\"")?;
                    writer.write_all(field_type.xml_name()?.as_bytes())?;
                    writer.write_all(b"\" field=\"")?;
                    codec::write_integer(writer, i64::from(id))?;
                    writer.write_all(b"\"")?;
                }
                writer.write_all(b">")?;
            }
            Tag::Close(name) => {
                writer.write_all(b"</")?;
                writer.write_all(name.as_bytes())?;
                writer.write_all(b">")?;
            }
        }
        Ok(())
    }

    pub fn expect_from<R: Read>(&self, reader: &mut LookaheadReader<R>) -> Result<()> {
        if let Some(preamble) = &self.preamble {
            preamble.expect_from(reader)?;
        }
        match self.tag {
            Tag::None => Ok(()),
            Tag::Open { name, field: None } => {
                reader.expect(b"<")?;
                reader.expect(name.as_bytes())?;
                reader.expect(b">")
            }
            Tag::Open {
                name,
                field: Some(expected),
            } => {
                let tag = OpenTag::read_from(reader)?;
                if tag.name != name || tag.field != Some(expected) {
                    return Err(ProtocolError::malformed(
                        format!("<{name} {expected:?}>"),
                        format!("<{} {:?}>", tag.name, tag.field),
                    ));
                }
                Ok(())
            }
            Tag::Close(name) => {
                reader.expect(b"</")?;
                reader.expect(name.as_bytes())?;
                reader.expect(b">")
            }
        }
    }
}

/// An opening tag as read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    pub field: Option<(TType, i16)>,
}

impl OpenTag {
    /// Reads `<name>` or `<name type="T" field="id">`.
    ///
    /// Closing tags come back with a name starting with `/`.
    pub fn read_from<R: Read>(reader: &mut LookaheadReader<R>) -> Result<Self> {
        reader.expect(b"<")?;
        let (name, terminator) = escape::read_markup_text(reader, b" >")?;
        let name = utf8(name)?;
        if terminator == b'>' {
            return Ok(Self { name, field: None });
        }

        reader.expect(b"type=\"")?;
        let (type_name, _) = escape::read_markup_text(reader, b"\"")?;
        reader.expect(b" field=\"")?;
        let id_text = codec::read_numeric_chars(reader)?;
        reader.expect(b"\">")?;

        let field_type = TType::from_xml_name(&type_name)?;
        let id = id_text
            .parse::<i16>()
            .map_err(|_| ProtocolError::InvalidNumericData(id_text))?;

        Ok(Self {
            name,
            field: Some((field_type, id)),
        })
    }

    /// Checks if this is a closing tag standing in for the stop field.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.name.starts_with('/')
    }
}

pub(crate) fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| ProtocolError::Encoding(e.to_string()))
}

/// A struct or a field: an opening and a closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairContext {
    name: String,
    field: Option<(TType, i16)>,
    open: bool,
}

impl PairContext {
    /// A pair whose next transition is its opening tag.
    pub fn new(name: impl Into<String>, field: Option<(TType, i16)>) -> Self {
        Self {
            name: name.into(),
            field,
            open: true,
        }
    }

    /// A pair whose opening tag has already been consumed.
    pub fn opened(tag: OpenTag) -> Self {
        Self {
            name: tag.name,
            field: tag.field,
            open: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self) -> Step<'_> {
        let tag = if self.open {
            Tag::Open {
                name: &self.name,
                field: self.field,
            }
        } else {
            Tag::Close(&self.name)
        };
        self.open = !self.open;
        Step::tag(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapStage {
    OpenKey,
    CloseKey,
    OpenValue,
    CloseValue,
}

/// Map body: `<key>…</key><val>…</val>` per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapContext {
    preamble: Preamble,
    preamble_pending: bool,
    stage: MapStage,
}

impl MapContext {
    pub const fn new(key_type: TType, value_type: TType, count: i32) -> Self {
        Self {
            preamble: Preamble {
                key_type: Some(key_type),
                value_type,
                count,
            },
            preamble_pending: true,
            stage: MapStage::OpenKey,
        }
    }

    /// A map whose preamble was already consumed from the input.
    pub const fn after_preamble(preamble: Preamble) -> Self {
        Self {
            preamble,
            preamble_pending: false,
            stage: MapStage::OpenKey,
        }
    }

    fn advance(&mut self) -> Step<'static> {
        let (tag, next) = match self.stage {
            MapStage::OpenKey => (Tag::Open { name: "key", field: None }, MapStage::CloseKey),
            MapStage::CloseKey => (Tag::Close("key"), MapStage::OpenValue),
            MapStage::OpenValue => (Tag::Open { name: "val", field: None }, MapStage::CloseValue),
            MapStage::CloseValue => (Tag::Close("val"), MapStage::OpenKey),
        };
        self.stage = next;
        Step {
            preamble: take_preamble(&mut self.preamble_pending, self.preamble),
            tag,
        }
    }
}

/// List or set body: `<val>…</val>` per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContext {
    preamble: Preamble,
    preamble_pending: bool,
    open: bool,
}

impl ListContext {
    pub const fn new(element_type: TType, count: i32) -> Self {
        Self {
            preamble: Preamble {
                key_type: None,
                value_type: element_type,
                count,
            },
            preamble_pending: true,
            open: true,
        }
    }

    /// A list whose preamble was already consumed from the input.
    pub const fn after_preamble(preamble: Preamble) -> Self {
        Self {
            preamble,
            preamble_pending: false,
            open: true,
        }
    }

    fn advance(&mut self) -> Step<'static> {
        let tag = if self.open {
            Tag::Open { name: "val", field: None }
        } else {
            Tag::Close("val")
        };
        self.open = !self.open;
        Step {
            preamble: take_preamble(&mut self.preamble_pending, self.preamble),
            tag,
        }
    }
}

fn take_preamble(pending: &mut bool, preamble: Preamble) -> Option<Preamble> {
    std::mem::take(pending).then_some(preamble)
}

/// Position in the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Context {
    /// Top level, or a field value whose tags were handled eagerly.
    #[default]
    Base,
    Pair(PairContext),
    Map(MapContext),
    /// Lists and sets share a context.
    List(ListContext),
}

impl Context {
    /// Moves the state machine one step.
    pub fn advance(&mut self) -> Step<'_> {
        match self {
            Self::Base => Step::tag(Tag::None),
            Self::Pair(pair) => pair.advance(),
            Self::Map(map) => map.advance(),
            Self::List(list) => list.advance(),
        }
    }

    /// Returns a container preamble that was never emitted, marking it done.
    ///
    /// Containers without elements never transition, so their header has to
    /// be flushed when they end.
    pub fn take_pending_preamble(&mut self) -> Option<Preamble> {
        match self {
            Self::Map(map) => take_preamble(&mut map.preamble_pending, map.preamble),
            Self::List(list) => take_preamble(&mut list.preamble_pending, list.preamble),
            Self::Base | Self::Pair(_) => None,
        }
    }

    /// Checks if this is a pair whose closing tag is still outstanding.
    #[must_use]
    pub fn awaits_close(&self) -> bool {
        matches!(self, Self::Pair(pair) if !pair.open)
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Pair(_) => "pair",
            Self::Map(_) => "map",
            Self::List(_) => "list",
        }
    }
}

/// The current context plus the frames it was pushed over.
#[derive(Debug, Default)]
pub struct ContextStack {
    current: Context,
    saved: Vec<Context>,
    max_depth: Option<usize>,
}

impl ContextStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stack that refuses to nest deeper than `max_depth`.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::default()
        }
    }

    pub fn push(&mut self, context: Context) -> Result<()> {
        if let Some(max) = self.max_depth {
            if self.saved.len() >= max {
                return Err(ProtocolError::DepthLimit(max));
            }
        }
        trace!(kind = context.kind(), depth = self.saved.len() + 1, "push context");
        let previous = std::mem::replace(&mut self.current, context);
        self.saved.push(previous);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Context> {
        let previous = self.saved.pop().ok_or(ProtocolError::UnbalancedEnd)?;
        let popped = std::mem::replace(&mut self.current, previous);
        trace!(kind = popped.kind(), depth = self.saved.len(), "pop context");
        Ok(popped)
    }

    #[must_use]
    pub const fn current(&self) -> &Context {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Context {
        &mut self.current
    }

    /// Number of contexts pushed over the base.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Drops every frame and returns to the base context.
    pub fn clear(&mut self) {
        self.saved.clear();
        self.current = Context::Base;
    }

    /// Runs one transition of the current context against the transport.
    ///
    /// Writing emits the step; reading consumes it and fails on any
    /// mismatch.
    pub fn transition<T: Read + Write>(
        &mut self,
        direction: Direction,
        io: &mut LookaheadReader<T>,
    ) -> Result<()> {
        let step = self.current.advance();
        match direction {
            Direction::Write => step.write_to(io.get_mut()),
            Direction::Read => step.expect_from(io),
        }
    }
}
