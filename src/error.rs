//! Error types for the OTF codec

use alloc::string::String;
use core::fmt;

use crate::primitive::PrimitiveType;

/// Errors that can occur while reading or writing buffers, loading schemas or
/// decoding messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Access would exceed the buffer capacity and no (or a failed) growth
    BufferOverflow {
        /// Requested limit in bytes
        limit: usize,
        /// Capacity of the buffer at the time of the request
        capacity: usize,
    },
    /// Write attempted on a view over immutable bytes
    ReadOnlyBuffer,
    /// Primitive type code that the codec does not map
    UnsupportedPrimitiveType(u8),
    /// Bootstrap frame carries an IR version this codec does not speak
    UnsupportedIrVersion(i32),
    /// Header tokens lack a required field
    MissingHeaderField(&'static str),
    /// No message registered for the template id
    UnknownMessageId(i64),
    /// No type captured under the name
    UnknownTypeName(String),
    /// No field, group or var-data construct with the name
    UnknownFieldName(String),
    /// Token stream is not well-nested or breaks a structural shape
    MalformedTokenStream {
        /// Index of the offending token
        index: usize,
        /// What was wrong
        reason: &'static str,
    },
    /// Value cannot be stored as the given primitive type
    IncompatibleValue(PrimitiveType),
    /// Integer overflow in calculations or conversions
    Overflow,
    /// String metadata is not valid UTF-8
    InvalidUtf8,
    /// Compressed IR envelope could not be inflated
    #[cfg(feature = "lz4")]
    Decompress,
}

impl Error {
    /// Returns a human-readable description of the error
    pub const fn description(&self) -> &'static str {
        match self {
            Error::BufferOverflow { .. } => "limit is beyond buffer capacity",
            Error::ReadOnlyBuffer => "buffer is read-only",
            Error::UnsupportedPrimitiveType(_) => "unsupported primitive type",
            Error::UnsupportedIrVersion(_) => "unsupported IR version",
            Error::MissingHeaderField(_) => "header is missing a required field",
            Error::UnknownMessageId(_) => "unknown message id",
            Error::UnknownTypeName(_) => "unknown type name",
            Error::UnknownFieldName(_) => "unknown field name",
            Error::MalformedTokenStream { .. } => "malformed token stream",
            Error::IncompatibleValue(_) => "value incompatible with primitive type",
            Error::Overflow => "integer overflow in calculations",
            Error::InvalidUtf8 => "string is not valid UTF-8",
            #[cfg(feature = "lz4")]
            Error::Decompress => "failed to decompress IR envelope",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferOverflow { limit, capacity } => {
                write!(f, "limit={} is beyond capacity={}", limit, capacity)
            }
            Error::UnsupportedPrimitiveType(code) => {
                write!(f, "{}: code {}", self.description(), code)
            }
            Error::UnsupportedIrVersion(version) => {
                write!(f, "{}: {}", self.description(), version)
            }
            Error::MissingHeaderField(name) => write!(f, "{}: {}", self.description(), name),
            Error::UnknownMessageId(id) => write!(f, "{}: {}", self.description(), id),
            Error::UnknownTypeName(name) | Error::UnknownFieldName(name) => {
                write!(f, "{}: {}", self.description(), name)
            }
            Error::MalformedTokenStream { index, reason } => {
                write!(f, "{} at token {}: {}", self.description(), index, reason)
            }
            Error::IncompatibleValue(ty) => write!(f, "{}: {}", self.description(), ty.name()),
            _ => f.write_str(self.description()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias for codec operations
pub type Result<T> = core::result::Result<T, Error>;
