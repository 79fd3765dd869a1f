//! Error types for the protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol errors.
///
/// Every error is terminal for the call that produced it. The protocol
/// instance must be [`reset`](crate::XmlProtocol::reset) before it is used
/// again.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A type name on the wire is not one of the registered names.
    #[error("unrecognized type name: {0:?}")]
    UnrecognizedType(String),

    /// A type tag has no wire name (including `stop`).
    #[error("unsupported type tag: {0}")]
    UnsupportedType(u8),

    /// Expected literal markup was not found.
    #[error("malformed tag: expected {expected:?}, found {found:?}")]
    MalformedTag { expected: String, found: String },

    /// Bad `&` escape continuation, or a raw `<` inside markup text.
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),

    /// Numeric text could not be parsed.
    #[error("invalid numeric data: {0:?}")]
    InvalidNumericData(String),

    /// The message envelope carries an unsupported version.
    #[error("bad protocol version: expected {expected}, found {found}")]
    BadVersion { expected: i64, found: i64 },

    /// Unknown message type in the envelope.
    #[error("unknown message type: {0}")]
    UnknownMessageType(i64),

    /// Text cannot be represented on the wire, or is not valid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Binary payload is not valid unpadded base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// A container declared a negative size.
    #[error("negative container size: {0}")]
    NegativeSize(i64),

    /// A string or container exceeded the configured limit.
    #[error("{what} too large: {size} (max {max})")]
    SizeLimit {
        what: &'static str,
        size: usize,
        max: usize,
    },

    /// Nesting exceeded the configured maximum depth.
    #[error("nesting depth limit exceeded: {0}")]
    DepthLimit(usize),

    /// An `end` call had no matching `begin`.
    #[error("unbalanced end: no open context")]
    UnbalancedEnd,

    /// I/O error from the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns the cross-language exception code for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnrecognizedType(_) | Self::UnsupportedType(_) => ErrorKind::NotImplemented,
            Self::MalformedTag { .. }
            | Self::InvalidEscape(_)
            | Self::InvalidNumericData(_)
            | Self::UnknownMessageType(_)
            | Self::Encoding(_)
            | Self::InvalidBase64(_) => ErrorKind::InvalidData,
            Self::BadVersion { .. } => ErrorKind::BadVersion,
            Self::NegativeSize(_) => ErrorKind::NegativeSize,
            Self::SizeLimit { .. } => ErrorKind::SizeLimit,
            Self::DepthLimit(_) => ErrorKind::DepthLimit,
            Self::UnbalancedEnd | Self::Transport(_) => ErrorKind::Unknown,
        }
    }

    pub(crate) fn malformed(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MalformedTag {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Protocol exception codes shared with other language bindings.
///
/// These let a peer report a decode failure in a form every implementation
/// understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Unclassified failure.
    Unknown = 0,
    /// Malformed or unparseable data.
    InvalidData = 1,
    /// A negative size was declared.
    NegativeSize = 2,
    /// A configured size limit was exceeded.
    SizeLimit = 3,
    /// Unsupported protocol version.
    BadVersion = 4,
    /// Type or feature not implemented.
    NotImplemented = 5,
    /// Nesting depth limit exceeded.
    DepthLimit = 6,
}

impl ErrorKind {
    /// Returns the numeric value of this error kind.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates an error kind from a numeric value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::InvalidData),
            2 => Some(Self::NegativeSize),
            3 => Some(Self::SizeLimit),
            4 => Some(Self::BadVersion),
            5 => Some(Self::NotImplemented),
            6 => Some(Self::DepthLimit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::InvalidData => write!(f, "invalid_data"),
            Self::NegativeSize => write!(f, "negative_size"),
            Self::SizeLimit => write!(f, "size_limit"),
            Self::BadVersion => write!(f, "bad_version"),
            Self::NotImplemented => write!(f, "not_implemented"),
            Self::DepthLimit => write!(f, "depth_limit"),
        }
    }
}
