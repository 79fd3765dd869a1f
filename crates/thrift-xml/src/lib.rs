//! Tag-delimited text protocol for the cross-language RPC framework.
//!
//! This crate serializes booleans, integers, doubles, strings, binary blobs
//! and nested structs, maps, lists and sets into a narrow XML-like markup,
//! and parses that markup back. It is a streaming single-pass transducer over
//! a blocking byte channel: no document tree is ever built, and anything
//! outside the grammar below is rejected, even if it is well-formed XML.
//!
//! # Wire Format
//!
//! ```text
//! message   := int "<name>" string "</name><type>" int "</type><seqid>" int "</seqid>"
//! struct    := "<" name ">" field* "</" name ">"
//! field     := "<" name " type=\"" T "\" field=\"" id "\">" value "</" name ">"
//! stop      := "</" name ">"                 (the struct's own closing tag)
//! map       := "<key_type>" T "</key_type><val_type>" T "</val_type>"
//!              "<entry_count>" int "</entry_count>"
//!              ("<key>" value "</key><val>" value "</val>")*
//! list/set  := "<val_type>" T "</val_type><entry_count>" int "</entry_count>"
//!              ("<val>" value "</val>")*
//! string    := text with '&' -> "&amp;" and '<' -> "&lt;"
//! binary    := base64 without '=' padding
//! ```
//!
//! # Example
//!
//! ```
//! use thrift_xml::{
//!     FieldIdent, InputProtocol, MemoryBuffer, OutputProtocol, StructIdent, TType, XmlProtocol,
//! };
//!
//! let mut protocol = XmlProtocol::new(MemoryBuffer::new());
//! protocol.write_struct_begin(&StructIdent::new("Point"))?;
//! protocol.write_field_begin(&FieldIdent::new("x", TType::I32, 1))?;
//! protocol.write_i32(3)?;
//! protocol.write_field_end()?;
//! protocol.write_field_stop()?;
//! protocol.write_struct_end()?;
//!
//! assert_eq!(
//!     protocol.transport().as_bytes(),
//!     br#"<Point><x type="int" field="1">3</x></Point>"#
//! );
//!
//! assert_eq!(protocol.read_struct_begin()?.name, "Point");
//! let field = protocol.read_field_begin()?;
//! assert_eq!((field.field_type, field.id), (TType::I32, 1));
//! assert_eq!(protocol.read_i32()?, 3);
//! protocol.read_field_end()?;
//! assert!(protocol.read_field_begin()?.is_stop());
//! protocol.read_struct_end()?;
//! # Ok::<(), thrift_xml::ProtocolError>(())
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod escape;
mod error;
mod protocol;
pub mod reader;
mod transport;
mod types;

// Re-export core types
pub use config::{ConfigError, ProtocolConfig};
pub use error::{ErrorKind, ProtocolError, Result};
pub use protocol::{
    skip, InputProtocol, OutputProtocol, XmlProtocol, XmlProtocolFactory, MAX_SKIP_DEPTH,
};
pub use reader::LookaheadReader;
pub use transport::{MemoryBuffer, Transport};
pub use types::{
    type_name_for_tag, FieldIdent, ListIdent, MapIdent, MessageIdent, MessageType, SetIdent,
    StructIdent, TType,
};

/// Protocol version constants.
pub mod version {
    /// Current protocol version, written as the first token of every message.
    pub const CURRENT: i64 = 1;
}
