//! The protocol façade.
//!
//! [`XmlProtocol`] turns one call per logical event ("begin struct", "write
//! field", "write i32", ...) into markup on the transport, and parses that
//! markup back on the read side. Every value is bracketed by an explicit
//! `enter_value`/`exit_value` pair on the current context, which is where
//! field tags and container element tags come from.

use std::io::{Read, Write};

use tracing::debug;

use crate::codec;
use crate::config::ProtocolConfig;
use crate::context::{
    utf8, Context, ContextStack, Direction, ListContext, MapContext, OpenTag, PairContext, Preamble,
};
use crate::error::{ProtocolError, Result};
use crate::escape;
use crate::reader::LookaheadReader;
use crate::types::{
    FieldIdent, ListIdent, MapIdent, MessageIdent, MessageType, SetIdent, StructIdent, TType,
};

/// Element names wrapping the envelope fields after the version.
const ENVELOPE_NAME: &str = "name";
const ENVELOPE_TYPE: &str = "type";
const ENVELOPE_SEQID: &str = "seqid";

/// Write half of the protocol operation set.
pub trait OutputProtocol {
    fn write_message_begin(&mut self, message: &MessageIdent) -> Result<()>;
    fn write_message_end(&mut self) -> Result<()>;
    fn write_struct_begin(&mut self, ident: &StructIdent) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;
    fn write_field_begin(&mut self, field: &FieldIdent) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_field_stop(&mut self) -> Result<()>;
    fn write_map_begin(&mut self, map: &MapIdent) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;
    fn write_list_begin(&mut self, list: &ListIdent) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;
    fn write_set_begin(&mut self, set: &SetIdent) -> Result<()>;
    fn write_set_end(&mut self) -> Result<()>;
    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_i8(&mut self, value: i8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_double(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary(&mut self, value: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Read half of the protocol operation set.
pub trait InputProtocol {
    fn read_message_begin(&mut self) -> Result<MessageIdent>;
    fn read_message_end(&mut self) -> Result<()>;
    fn read_struct_begin(&mut self) -> Result<StructIdent>;
    fn read_struct_end(&mut self) -> Result<()>;
    /// Returns a field whose type is [`TType::Stop`] at the end of a struct.
    fn read_field_begin(&mut self) -> Result<FieldIdent>;
    fn read_field_end(&mut self) -> Result<()>;
    fn read_map_begin(&mut self) -> Result<MapIdent>;
    fn read_map_end(&mut self) -> Result<()>;
    fn read_list_begin(&mut self) -> Result<ListIdent>;
    fn read_list_end(&mut self) -> Result<()>;
    fn read_set_begin(&mut self) -> Result<SetIdent>;
    fn read_set_end(&mut self) -> Result<()>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_i8(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Vec<u8>>;
}

/// Tag-delimited text protocol over a blocking transport.
///
/// One instance owns one context stack and one lookahead byte, so it must
/// not be shared between concurrent streams. After any error the instance is
/// only usable again once [`reset`](Self::reset) has been called.
#[derive(Debug)]
pub struct XmlProtocol<T> {
    io: LookaheadReader<T>,
    stack: ContextStack,
    config: ProtocolConfig,
}

impl<T: Read + Write> XmlProtocol<T> {
    /// Creates a protocol with default limits.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ProtocolConfig::default())
    }

    pub fn with_config(transport: T, config: ProtocolConfig) -> Self {
        Self {
            io: LookaheadReader::new(transport),
            stack: ContextStack::with_max_depth(config.max_depth),
            config,
        }
    }

    /// Discards the context stack and the lookahead byte.
    ///
    /// Used between independent messages on a kept-open transport.
    pub fn reset(&mut self) {
        debug!(depth = self.stack.depth(), "resetting protocol state");
        self.stack.clear();
        self.io.clear();
    }

    /// Number of contexts currently pushed. Zero between documents.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    #[must_use]
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub const fn transport(&self) -> &T {
        self.io.get_ref()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.io.get_mut()
    }

    /// Returns the transport. A buffered lookahead byte is lost.
    pub fn into_inner(self) -> T {
        self.io.into_inner()
    }

    /// Opens whatever markup the current context places before a value.
    fn enter_value(&mut self, direction: Direction) -> Result<()> {
        self.stack.transition(direction, &mut self.io)
    }

    /// Closes whatever markup the current context places after a value.
    fn exit_value(&mut self, direction: Direction) -> Result<()> {
        self.stack.transition(direction, &mut self.io)
    }

    fn writer(&mut self) -> &mut T {
        self.io.get_mut()
    }

    fn write_integer_value(&mut self, value: i64) -> Result<()> {
        self.enter_value(Direction::Write)?;
        codec::write_integer(self.writer(), value)?;
        self.exit_value(Direction::Write)
    }

    fn read_integer_value(&mut self) -> Result<i64> {
        self.enter_value(Direction::Read)?;
        let value = codec::read_integer(&mut self.io)?;
        self.exit_value(Direction::Read)?;
        Ok(value)
    }

    fn read_text_value(&mut self) -> Result<Vec<u8>> {
        self.enter_value(Direction::Read)?;
        let text = escape::read_text(&mut self.io, self.config.string_limit)?;
        self.exit_value(Direction::Read)?;
        Ok(text)
    }

    /// Writes one envelope element as `<name>value</name>`.
    fn write_envelope_element(
        &mut self,
        name: &str,
        write: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.stack.push(Context::Pair(PairContext::new(name, None)))?;
        write(self)?;
        self.stack.pop()?;
        Ok(())
    }

    fn read_envelope_element<V>(
        &mut self,
        name: &str,
        read: impl FnOnce(&mut Self) -> Result<V>,
    ) -> Result<V> {
        self.stack.push(Context::Pair(PairContext::new(name, None)))?;
        let value = read(self)?;
        self.stack.pop()?;
        Ok(value)
    }

    fn write_container_begin(&mut self, context: Context, size: i32) -> Result<()> {
        if size < 0 {
            return Err(ProtocolError::NegativeSize(i64::from(size)));
        }
        self.enter_value(Direction::Write)?;
        self.stack.push(context)
    }

    fn write_container_end(&mut self) -> Result<()> {
        if let Some(preamble) = self.stack.current_mut().take_pending_preamble() {
            preamble.write_to(self.io.get_mut())?;
        }
        self.stack.pop()?;
        self.exit_value(Direction::Write)
    }

    fn read_container_begin(&mut self, with_key: bool) -> Result<Preamble> {
        self.enter_value(Direction::Read)?;
        let preamble = Preamble::read_from(&mut self.io, with_key)?;
        self.check_container_size(preamble.count)?;
        let context = if with_key {
            Context::Map(MapContext::after_preamble(preamble))
        } else {
            Context::List(ListContext::after_preamble(preamble))
        };
        self.stack.push(context)?;
        Ok(preamble)
    }

    fn read_container_end(&mut self) -> Result<()> {
        self.stack.pop()?;
        self.exit_value(Direction::Read)
    }

    fn check_container_size(&self, count: i32) -> Result<()> {
        let size = usize::try_from(count).map_err(|_| ProtocolError::NegativeSize(i64::from(count)))?;
        match self.config.container_limit {
            Some(max) if size > max => Err(ProtocolError::SizeLimit {
                what: "container",
                size,
                max,
            }),
            _ => Ok(()),
        }
    }
}

/// Rejects names that cannot appear verbatim inside a tag.
fn validate_name(name: &str, what: &str) -> Result<()> {
    if let Some(bad) = name
        .chars()
        .find(|c| matches!(c, '<' | '>' | '&' | '"') || c.is_whitespace())
    {
        return Err(ProtocolError::Encoding(format!(
            "{what} name {name:?} contains {bad:?}"
        )));
    }
    Ok(())
}

impl<T: Read + Write> OutputProtocol for XmlProtocol<T> {
    fn write_message_begin(&mut self, message: &MessageIdent) -> Result<()> {
        debug!(
            name = %message.name,
            message_type = message.message_type.as_u8(),
            sequence_number = message.sequence_number,
            "writing message"
        );
        codec::write_integer(self.writer(), crate::version::CURRENT)?;
        self.write_envelope_element(ENVELOPE_NAME, |p| p.write_string(&message.name))?;
        self.write_envelope_element(ENVELOPE_TYPE, |p| {
            p.write_integer_value(i64::from(message.message_type.as_u8()))
        })?;
        self.write_envelope_element(ENVELOPE_SEQID, |p| {
            p.write_integer_value(i64::from(message.sequence_number))
        })
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, ident: &StructIdent) -> Result<()> {
        validate_name(&ident.name, "struct")?;
        self.enter_value(Direction::Write)?;
        self.stack
            .push(Context::Pair(PairContext::new(ident.name.as_str(), None)))?;
        self.stack.transition(Direction::Write, &mut self.io)
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.stack.transition(Direction::Write, &mut self.io)?;
        self.stack.pop()?;
        self.exit_value(Direction::Write)
    }

    fn write_field_begin(&mut self, field: &FieldIdent) -> Result<()> {
        validate_name(&field.name, "field")?;
        if field.name.is_empty() || field.name.starts_with('/') {
            return Err(ProtocolError::Encoding(format!(
                "field name {:?} is indistinguishable from the stop marker",
                field.name
            )));
        }
        field.field_type.xml_name()?;
        self.stack.push(Context::Pair(PairContext::new(
            field.name.as_str(),
            Some((field.field_type, field.id)),
        )))
    }

    fn write_field_end(&mut self) -> Result<()> {
        self.stack.pop().map(drop)
    }

    /// The struct's closing tag doubles as the stop marker.
    fn write_field_stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, map: &MapIdent) -> Result<()> {
        let context = Context::Map(MapContext::new(map.key_type, map.value_type, map.size));
        self.write_container_begin(context, map.size)
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.write_container_end()
    }

    fn write_list_begin(&mut self, list: &ListIdent) -> Result<()> {
        let context = Context::List(ListContext::new(list.element_type, list.size));
        self.write_container_begin(context, list.size)
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.write_container_end()
    }

    fn write_set_begin(&mut self, set: &SetIdent) -> Result<()> {
        let context = Context::List(ListContext::new(set.element_type, set.size));
        self.write_container_begin(context, set.size)
    }

    fn write_set_end(&mut self) -> Result<()> {
        self.write_container_end()
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_integer_value(i64::from(value))
    }

    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_integer_value(i64::from(value))
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_integer_value(i64::from(value))
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_integer_value(i64::from(value))
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_integer_value(value)
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.enter_value(Direction::Write)?;
        codec::write_double(self.writer(), value)?;
        self.exit_value(Direction::Write)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.enter_value(Direction::Write)?;
        escape::write_escaped(self.writer(), value.as_bytes())?;
        self.exit_value(Direction::Write)
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.enter_value(Direction::Write)?;
        codec::write_base64(self.writer(), value)?;
        self.exit_value(Direction::Write)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer().flush()?;
        Ok(())
    }
}

impl<T: Read + Write> InputProtocol for XmlProtocol<T> {
    fn read_message_begin(&mut self) -> Result<MessageIdent> {
        let version = self.read_integer_value()?;
        if version != crate::version::CURRENT {
            return Err(ProtocolError::BadVersion {
                expected: crate::version::CURRENT,
                found: version,
            });
        }

        let name = self.read_envelope_element(ENVELOPE_NAME, |p| p.read_string())?;
        let message_type = self.read_envelope_element(ENVELOPE_TYPE, |p| p.read_integer_value())?;
        let message_type = MessageType::from_i64(message_type)
            .ok_or(ProtocolError::UnknownMessageType(message_type))?;
        let sequence_number = self.read_envelope_element(ENVELOPE_SEQID, |p| p.read_i32())?;

        debug!(
            name = %name,
            message_type = message_type.as_u8(),
            sequence_number,
            "read message"
        );

        Ok(MessageIdent {
            name,
            message_type,
            sequence_number,
        })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<StructIdent> {
        self.enter_value(Direction::Read)?;
        let tag = OpenTag::read_from(&mut self.io)?;
        if tag.is_stop() {
            return Err(ProtocolError::malformed("<struct>", format!("<{}>", tag.name)));
        }
        let ident = StructIdent::new(tag.name.as_str());
        self.stack.push(Context::Pair(PairContext::opened(tag)))?;
        Ok(ident)
    }

    fn read_struct_end(&mut self) -> Result<()> {
        // A stop field has usually consumed the closing tag already.
        if self.stack.current().awaits_close() {
            self.stack.transition(Direction::Read, &mut self.io)?;
        }
        self.stack.pop()?;
        self.exit_value(Direction::Read)
    }

    fn read_field_begin(&mut self) -> Result<FieldIdent> {
        let tag = OpenTag::read_from(&mut self.io)?;

        if tag.is_stop() {
            let Context::Pair(owner) = self.stack.current() else {
                return Err(ProtocolError::malformed("field", format!("<{}>", tag.name)));
            };
            if &tag.name[1..] != owner.name() {
                return Err(ProtocolError::malformed(
                    format!("</{}>", owner.name()),
                    format!("<{}>", tag.name),
                ));
            }
            // The closing tag of the struct has been consumed.
            self.stack.current_mut().advance();
            return Ok(FieldIdent::stop());
        }

        let Some((field_type, id)) = tag.field else {
            return Err(ProtocolError::malformed(
                format!("<{} type=\"…\" field=\"…\">", tag.name),
                format!("<{}>", tag.name),
            ));
        };
        if tag.name.is_empty() {
            return Err(ProtocolError::malformed("field name", "empty name"));
        }

        let ident = FieldIdent::new(tag.name.as_str(), field_type, id);
        self.stack.push(Context::Pair(PairContext::opened(tag)))?;
        // The value itself carries no markup; the field tags are the pair's.
        self.stack.push(Context::Base)?;
        Ok(ident)
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.stack.pop()?;
        self.stack.transition(Direction::Read, &mut self.io)?;
        self.stack.pop().map(drop)
    }

    fn read_map_begin(&mut self) -> Result<MapIdent> {
        let preamble = self.read_container_begin(true)?;
        let key_type = preamble
            .key_type
            .ok_or_else(|| ProtocolError::malformed("<key_type>", "<val_type>"))?;
        Ok(MapIdent::new(key_type, preamble.value_type, preamble.count))
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.read_container_end()
    }

    fn read_list_begin(&mut self) -> Result<ListIdent> {
        let preamble = self.read_container_begin(false)?;
        Ok(ListIdent::new(preamble.value_type, preamble.count))
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.read_container_end()
    }

    fn read_set_begin(&mut self) -> Result<SetIdent> {
        let preamble = self.read_container_begin(false)?;
        Ok(SetIdent::new(preamble.value_type, preamble.count))
    }

    fn read_set_end(&mut self) -> Result<()> {
        self.read_container_end()
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_integer_value()? != 0)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_integer_value()? as i8)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_integer_value()? as i16)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_integer_value()? as i32)
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.read_integer_value()
    }

    fn read_double(&mut self) -> Result<f64> {
        self.enter_value(Direction::Read)?;
        let value = codec::read_double(&mut self.io)?;
        self.exit_value(Direction::Read)?;
        Ok(value)
    }

    fn read_string(&mut self) -> Result<String> {
        utf8(self.read_text_value()?)
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        self.enter_value(Direction::Read)?;
        let bytes = codec::read_base64(&mut self.io, self.config.string_limit)?;
        self.exit_value(Direction::Read)?;
        Ok(bytes)
    }
}

/// Creates protocol instances sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct XmlProtocolFactory {
    config: ProtocolConfig,
}

impl XmlProtocolFactory {
    #[must_use]
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config }
    }

    /// Wraps a transport in a fresh protocol instance.
    pub fn create<T: Read + Write>(&self, transport: T) -> XmlProtocol<T> {
        XmlProtocol::with_config(transport, self.config.clone())
    }
}

/// Maximum nesting `skip` will follow.
pub const MAX_SKIP_DEPTH: usize = 64;

/// Reads and discards one value of type `field_type`.
///
/// Used by generated code for fields it does not recognise.
pub fn skip<P: InputProtocol + ?Sized>(protocol: &mut P, field_type: TType) -> Result<()> {
    skip_till_depth(protocol, field_type, MAX_SKIP_DEPTH)
}

fn skip_till_depth<P: InputProtocol + ?Sized>(
    protocol: &mut P,
    field_type: TType,
    depth: usize,
) -> Result<()> {
    if depth == 0 {
        return Err(ProtocolError::DepthLimit(MAX_SKIP_DEPTH));
    }

    match field_type {
        TType::Bool => protocol.read_bool().map(drop),
        TType::Byte => protocol.read_i8().map(drop),
        TType::I16 => protocol.read_i16().map(drop),
        TType::I32 => protocol.read_i32().map(drop),
        TType::I64 => protocol.read_i64().map(drop),
        TType::Double => protocol.read_double().map(drop),
        TType::String => protocol.read_string().map(drop),
        TType::Struct => {
            protocol.read_struct_begin()?;
            loop {
                let field = protocol.read_field_begin()?;
                if field.is_stop() {
                    break;
                }
                skip_till_depth(protocol, field.field_type, depth - 1)?;
                protocol.read_field_end()?;
            }
            protocol.read_struct_end()
        }
        TType::Map => {
            let map = protocol.read_map_begin()?;
            for _ in 0..map.size {
                skip_till_depth(protocol, map.key_type, depth - 1)?;
                skip_till_depth(protocol, map.value_type, depth - 1)?;
            }
            protocol.read_map_end()
        }
        TType::List => {
            let list = protocol.read_list_begin()?;
            for _ in 0..list.size {
                skip_till_depth(protocol, list.element_type, depth - 1)?;
            }
            protocol.read_list_end()
        }
        TType::Set => {
            let set = protocol.read_set_begin()?;
            for _ in 0..set.size {
                skip_till_depth(protocol, set.element_type, depth - 1)?;
            }
            protocol.read_set_end()
        }
        TType::Stop => Err(ProtocolError::UnsupportedType(TType::Stop.as_u8())),
    }
}
