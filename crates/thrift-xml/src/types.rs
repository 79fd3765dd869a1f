//! Wire type tags and the identifiers passed through the protocol.

use crate::error::{ProtocolError, Result};

/// Wire type tag.
///
/// Numeric values match the type ids used by every other binding of the
/// RPC framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TType {
    /// End-of-struct marker. Has no wire name.
    Stop = 0,
    /// Boolean.
    Bool = 2,
    /// Signed 8-bit integer.
    Byte = 3,
    /// 64-bit float.
    Double = 4,
    /// Signed 16-bit integer.
    I16 = 6,
    /// Signed 32-bit integer.
    I32 = 8,
    /// Signed 64-bit integer.
    I64 = 10,
    /// UTF-8 string or binary blob.
    String = 11,
    /// Nested struct.
    Struct = 12,
    /// Key/value map.
    Map = 13,
    /// Unordered set.
    Set = 14,
    /// Ordered list.
    List = 15,
}

impl TType {
    /// Creates a type tag from a numeric value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stop),
            2 => Some(Self::Bool),
            3 => Some(Self::Byte),
            4 => Some(Self::Double),
            6 => Some(Self::I16),
            8 => Some(Self::I32),
            10 => Some(Self::I64),
            11 => Some(Self::String),
            12 => Some(Self::Struct),
            13 => Some(Self::Map),
            14 => Some(Self::Set),
            15 => Some(Self::List),
            _ => None,
        }
    }

    /// Returns the numeric value of this type tag.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the canonical wire name of this type.
    ///
    /// Fails with [`ProtocolError::UnsupportedType`] for `Stop`.
    pub fn xml_name(self) -> Result<&'static str> {
        match self {
            Self::Bool => Ok("boolean"),
            Self::Byte => Ok("byte"),
            Self::I16 => Ok("short"),
            Self::I32 => Ok("int"),
            Self::I64 => Ok("long"),
            Self::Double => Ok("decimal"),
            Self::String => Ok("string"),
            Self::Struct => Ok("rec"),
            Self::Map => Ok("map"),
            Self::Set => Ok("set"),
            Self::List => Ok("list"),
            Self::Stop => Err(ProtocolError::UnsupportedType(Self::Stop.as_u8())),
        }
    }

    /// Resolves a wire name to its type tag. Exact, case-sensitive match.
    pub fn from_xml_name(name: &[u8]) -> Result<Self> {
        match name {
            b"boolean" => Ok(Self::Bool),
            b"byte" => Ok(Self::Byte),
            b"short" => Ok(Self::I16),
            b"int" => Ok(Self::I32),
            b"long" => Ok(Self::I64),
            b"decimal" => Ok(Self::Double),
            b"string" => Ok(Self::String),
            b"rec" => Ok(Self::Struct),
            b"map" => Ok(Self::Map),
            b"set" => Ok(Self::Set),
            b"list" => Ok(Self::List),
            other => Err(ProtocolError::UnrecognizedType(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

/// Returns the wire name for a raw type tag byte.
pub fn type_name_for_tag(tag: u8) -> Result<&'static str> {
    TType::from_u8(tag)
        .ok_or(ProtocolError::UnsupportedType(tag))?
        .xml_name()
}

impl std::fmt::Display for TType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.xml_name() {
            Ok(name) => f.write_str(name),
            Err(_) => f.write_str("stop"),
        }
    }
}

/// Kind of RPC message carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Request expecting a reply.
    Call = 1,
    /// Successful reply.
    Reply = 2,
    /// Application exception reply.
    Exception = 3,
    /// Request without reply.
    Oneway = 4,
}

impl MessageType {
    /// Creates a message type from a numeric value.
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Call),
            2 => Some(Self::Reply),
            3 => Some(Self::Exception),
            4 => Some(Self::Oneway),
            _ => None,
        }
    }

    /// Returns the numeric value of this message type.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Message envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdent {
    pub name: String,
    pub message_type: MessageType,
    pub sequence_number: i32,
}

impl MessageIdent {
    #[must_use]
    pub fn new(name: impl Into<String>, message_type: MessageType, sequence_number: i32) -> Self {
        Self {
            name: name.into(),
            message_type,
            sequence_number,
        }
    }
}

/// Struct header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructIdent {
    pub name: String,
}

impl StructIdent {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Field header. A `Stop` field type marks the end of a struct body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIdent {
    pub name: String,
    pub field_type: TType,
    pub id: i16,
}

impl FieldIdent {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: TType, id: i16) -> Self {
        Self {
            name: name.into(),
            field_type,
            id,
        }
    }

    /// The end-of-struct marker.
    #[must_use]
    pub fn stop() -> Self {
        Self {
            name: String::new(),
            field_type: TType::Stop,
            id: 0,
        }
    }

    /// Checks if this is the end-of-struct marker.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.field_type == TType::Stop
    }
}

/// Map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapIdent {
    pub key_type: TType,
    pub value_type: TType,
    pub size: i32,
}

impl MapIdent {
    #[must_use]
    pub const fn new(key_type: TType, value_type: TType, size: i32) -> Self {
        Self {
            key_type,
            value_type,
            size,
        }
    }
}

/// List header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListIdent {
    pub element_type: TType,
    pub size: i32,
}

impl ListIdent {
    #[must_use]
    pub const fn new(element_type: TType, size: i32) -> Self {
        Self { element_type, size }
    }
}

/// Set header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetIdent {
    pub element_type: TType,
    pub size: i32,
}

impl SetIdent {
    #[must_use]
    pub const fn new(element_type: TType, size: i32) -> Self {
        Self { element_type, size }
    }
}
