//! Primitive types and typed literal values
//!
//! Every leaf encoding in a schema names one of the [`PrimitiveType`]s. Literal
//! values carried by the schema itself (constants, min/max/null overrides) are
//! held as [`PrimitiveValue`]s.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};

/// Wire code used for tokens without a primitive type (structural tokens)
pub const NONE_CODE: u8 = 0;

/// Primitive types supported on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Single byte character
    Char,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// IEEE 754 single precision
    Float,
    /// IEEE 754 double precision
    Double,
}

impl PrimitiveType {
    /// All primitive types in wire-code order
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::UInt8,
        PrimitiveType::UInt16,
        PrimitiveType::UInt32,
        PrimitiveType::UInt64,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Schema name of the type
    pub const fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Size in bytes of one element
    pub const fn size(&self) -> usize {
        match self {
            PrimitiveType::Char | PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Double => 8,
        }
    }

    /// Wire code of the type in the bootstrap IR format
    pub const fn code(&self) -> u8 {
        match self {
            PrimitiveType::Char => 1,
            PrimitiveType::Int8 => 2,
            PrimitiveType::Int16 => 3,
            PrimitiveType::Int32 => 4,
            PrimitiveType::Int64 => 5,
            PrimitiveType::UInt8 => 6,
            PrimitiveType::UInt16 => 7,
            PrimitiveType::UInt32 => 8,
            PrimitiveType::UInt64 => 9,
            PrimitiveType::Float => 10,
            PrimitiveType::Double => 11,
        }
    }

    /// Map a wire code back to a type; [`NONE_CODE`] maps to `None`
    pub fn from_code(code: u8) -> Result<Option<Self>> {
        if code == NONE_CODE {
            return Ok(None);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.code() == code)
            .map(Some)
            .ok_or(Error::UnsupportedPrimitiveType(code))
    }

    /// Look up a type by its schema name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// True for the signed integer types
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    /// True for `float` and `double`
    pub const fn is_floating_point(&self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Value that marks an optional field as absent
    pub fn null_value(&self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MIN as i64),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MIN as i64),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MIN as i64),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(u8::MAX as u64),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(u16::MAX as u64),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(u32::MAX as u64),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(u64::MAX),
            PrimitiveType::Float => PrimitiveValue::Float(f32::NAN as f64),
            PrimitiveType::Double => PrimitiveValue::Float(f64::NAN),
        }
    }

    /// Smallest valid value
    pub fn min_value(&self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x20),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MIN as i64 + 1),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MIN as i64 + 1),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MIN as i64 + 1),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN + 1),
            PrimitiveType::UInt8
            | PrimitiveType::UInt16
            | PrimitiveType::UInt32
            | PrimitiveType::UInt64 => PrimitiveValue::UInt(0),
            PrimitiveType::Float => PrimitiveValue::Float(-f32::MAX as f64),
            PrimitiveType::Double => PrimitiveValue::Float(-f64::MAX),
        }
    }

    /// Largest valid value
    pub fn max_value(&self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x7E),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MAX as i64),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MAX as i64),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MAX as i64),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MAX),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(u8::MAX as u64 - 1),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(u16::MAX as u64 - 1),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(u32::MAX as u64 - 1),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(u64::MAX - 1),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MAX as f64),
            PrimitiveType::Double => PrimitiveValue::Float(f64::MAX),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed literal: a single primitive or a short byte sequence
///
/// Signed integers are held as `Int`, unsigned as `UInt`, both float widths as
/// `Float`. Multi-character constants are `Bytes`.
#[derive(Debug, Clone)]
pub enum PrimitiveValue {
    /// Single character
    Char(u8),
    /// Signed integer of any width
    Int(i64),
    /// Unsigned integer of any width
    UInt(u64),
    /// Floating point of either width
    Float(f64),
    /// Multi-byte character constant
    Bytes(Vec<u8>),
}

impl PrimitiveValue {
    /// Parse a schema literal as the given type
    pub fn parse(text: &str, ty: PrimitiveType) -> Result<Self> {
        match ty {
            PrimitiveType::Char if text.len() == 1 => Ok(PrimitiveValue::Char(text.as_bytes()[0])),
            PrimitiveType::Char => Ok(PrimitiveValue::Bytes(text.as_bytes().to_vec())),
            PrimitiveType::Float => text
                .trim()
                .parse::<f32>()
                .map(|v| PrimitiveValue::Float(v as f64))
                .map_err(|_| Error::IncompatibleValue(ty)),
            PrimitiveType::Double => text
                .trim()
                .parse::<f64>()
                .map(PrimitiveValue::Float)
                .map_err(|_| Error::IncompatibleValue(ty)),
            ty if ty.is_signed() => text
                .trim()
                .parse::<i64>()
                .map(PrimitiveValue::Int)
                .map_err(|_| Error::IncompatibleValue(ty)),
            _ => text
                .trim()
                .parse::<u64>()
                .map(PrimitiveValue::UInt)
                .map_err(|_| Error::IncompatibleValue(ty)),
        }
    }

    /// Round a float held for a `float` type to the precision it has on
    /// the wire; other values pass through
    pub fn narrowed(self, ty: PrimitiveType) -> Self {
        match (ty, self) {
            (PrimitiveType::Float, PrimitiveValue::Float(v)) => PrimitiveValue::Float(v as f32 as f64),
            (_, value) => value,
        }
    }

    /// Whether the value survives being stored as `ty` unchanged
    pub fn is_exact_for(&self, ty: PrimitiveType) -> bool {
        match (ty, self) {
            (PrimitiveType::Float, PrimitiveValue::Float(v)) => v.is_nan() || (*v as f32) as f64 == *v,
            _ => true,
        }
    }

    /// Value as a signed integer, if representable
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PrimitiveValue::Char(c) => Some(c as i64),
            PrimitiveValue::Int(v) => Some(v),
            PrimitiveValue::UInt(v) => i64::try_from(v).ok(),
            PrimitiveValue::Float(_) | PrimitiveValue::Bytes(_) => None,
        }
    }

    /// Value as an unsigned integer, if representable
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PrimitiveValue::Char(c) => Some(c as u64),
            PrimitiveValue::Int(v) => u64::try_from(v).ok(),
            PrimitiveValue::UInt(v) => Some(v),
            PrimitiveValue::Float(_) | PrimitiveValue::Bytes(_) => None,
        }
    }

    /// Value as a float; integers convert with the usual precision loss
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PrimitiveValue::Char(c) => Some(c as f64),
            PrimitiveValue::Int(v) => Some(v as f64),
            PrimitiveValue::UInt(v) => Some(v as f64),
            PrimitiveValue::Float(v) => Some(v),
            PrimitiveValue::Bytes(_) => None,
        }
    }

    /// Raw bytes of a character value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PrimitiveValue::Char(c) => Some(core::slice::from_ref(c)),
            PrimitiveValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Number of bytes the value occupies when stored as `ty`
    pub fn encoded_len(&self, ty: PrimitiveType) -> usize {
        match self {
            PrimitiveValue::Bytes(bytes) => bytes.len(),
            _ => ty.size(),
        }
    }

    /// True when the value equals the null value of `ty`
    pub fn is_null_for(&self, ty: PrimitiveType) -> bool {
        match (self, ty.null_value()) {
            (PrimitiveValue::Float(v), PrimitiveValue::Float(_)) => v.is_nan(),
            (value, null) => *value == null,
        }
    }
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrimitiveValue::Char(a), PrimitiveValue::Char(b)) => a == b,
            (PrimitiveValue::Int(a), PrimitiveValue::Int(b)) => a == b,
            (PrimitiveValue::UInt(a), PrimitiveValue::UInt(b)) => a == b,
            // bitwise so that NaN null values compare equal to themselves
            (PrimitiveValue::Float(a), PrimitiveValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PrimitiveValue::Bytes(a), PrimitiveValue::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrimitiveValue {}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Char(c) => write!(f, "{}", *c as char),
            PrimitiveValue::Int(v) => write!(f, "{}", v),
            PrimitiveValue::UInt(v) => write!(f, "{}", v),
            PrimitiveValue::Float(v) => write!(f, "{}", v),
            PrimitiveValue::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}
