//! Token and encoding model of the intermediate representation

use alloc::string::String;

use crate::error::{Error, Result};
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Structural role of a token in a flattened schema stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    /// Opens a message
    BeginMessage = 1,
    /// Closes a message
    EndMessage = 2,
    /// Opens a composite type
    BeginComposite = 3,
    /// Closes a composite type
    EndComposite = 4,
    /// Opens a field
    BeginField = 5,
    /// Closes a field
    EndField = 6,
    /// Opens a repeating group
    BeginGroup = 7,
    /// Closes a repeating group
    EndGroup = 8,
    /// Opens an enumeration
    BeginEnum = 9,
    /// One value of an enumeration
    ValidValue = 10,
    /// Closes an enumeration
    EndEnum = 11,
    /// Opens a bit set
    BeginSet = 12,
    /// One choice of a bit set
    Choice = 13,
    /// Closes a bit set
    EndSet = 14,
    /// Opens a variable length field
    BeginVarData = 15,
    /// Closes a variable length field
    EndVarData = 16,
    /// Leaf primitive encoding
    Encoding = 17,
}

impl Signal {
    /// Wire code of the signal
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Map a wire code back to a signal
    pub fn from_code(code: u8) -> Option<Self> {
        use Signal::*;
        Some(match code {
            1 => BeginMessage,
            2 => EndMessage,
            3 => BeginComposite,
            4 => EndComposite,
            5 => BeginField,
            6 => EndField,
            7 => BeginGroup,
            8 => EndGroup,
            9 => BeginEnum,
            10 => ValidValue,
            11 => EndEnum,
            12 => BeginSet,
            13 => Choice,
            14 => EndSet,
            15 => BeginVarData,
            16 => EndVarData,
            17 => Encoding,
            _ => return None,
        })
    }

    /// Matching closing signal for an opening one
    pub const fn end_of(&self) -> Option<Signal> {
        match self {
            Signal::BeginMessage => Some(Signal::EndMessage),
            Signal::BeginComposite => Some(Signal::EndComposite),
            Signal::BeginField => Some(Signal::EndField),
            Signal::BeginGroup => Some(Signal::EndGroup),
            Signal::BeginEnum => Some(Signal::EndEnum),
            Signal::BeginSet => Some(Signal::EndSet),
            Signal::BeginVarData => Some(Signal::EndVarData),
            _ => None,
        }
    }

    /// True for closing signals
    pub const fn is_end(&self) -> bool {
        matches!(
            self,
            Signal::EndMessage
                | Signal::EndComposite
                | Signal::EndField
                | Signal::EndGroup
                | Signal::EndEnum
                | Signal::EndSet
                | Signal::EndVarData
        )
    }
}

/// Whether a field is always present, may carry null, or is a schema constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Presence {
    /// Always present on the wire
    #[default]
    Required = 0,
    /// Present on the wire, null value means absent
    Optional = 1,
    /// No wire storage, value comes from the schema
    Constant = 2,
}

impl Presence {
    /// Wire code
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Presence::Required),
            1 => Some(Presence::Optional),
            2 => Some(Presence::Constant),
            _ => None,
        }
    }
}

/// Byte order of a primitive on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    LittleEndian = 0,
    /// Most significant byte first
    BigEndian = 1,
}

impl ByteOrder {
    /// Wire code
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ByteOrder::LittleEndian),
            1 => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }
}

/// Primitive encoding details attached to a token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encoding {
    /// Primitive type, absent on purely structural tokens
    pub primitive_type: Option<PrimitiveType>,
    /// Presence of the value
    pub presence: Presence,
    /// Byte order on the wire
    pub byte_order: ByteOrder,
    /// Schema override of the minimum value
    pub min_value: Option<PrimitiveValue>,
    /// Schema override of the maximum value
    pub max_value: Option<PrimitiveValue>,
    /// Schema override of the null value
    pub null_value: Option<PrimitiveValue>,
    /// Value of a constant, or the discriminant of a valid value / choice bit
    pub const_value: Option<PrimitiveValue>,
    /// Character encoding of text
    pub character_encoding: Option<String>,
    /// Epoch of a timestamp
    pub epoch: Option<String>,
    /// Time unit of a timestamp
    pub time_unit: Option<String>,
    /// Application semantic type
    pub semantic_type: Option<String>,
}

impl Encoding {
    /// Required little-endian encoding of `ty`
    pub fn new(ty: PrimitiveType) -> Self {
        Self {
            primitive_type: Some(ty),
            ..Self::default()
        }
    }

    fn fit(&self, value: PrimitiveValue) -> PrimitiveValue {
        match self.primitive_type {
            Some(ty) => value.narrowed(ty),
            None => value,
        }
    }

    /// Set the presence
    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// Set the byte order
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Set a constant value and mark the encoding constant
    pub fn with_const_value(mut self, value: PrimitiveValue) -> Self {
        self.presence = Presence::Constant;
        self.const_value = Some(self.fit(value));
        self
    }

    /// Set the discriminant of a valid value or choice without changing presence
    pub fn with_value(mut self, value: PrimitiveValue) -> Self {
        self.const_value = Some(self.fit(value));
        self
    }

    /// Override the null value
    pub fn with_null_value(mut self, value: PrimitiveValue) -> Self {
        self.null_value = Some(self.fit(value));
        self
    }

    /// Override the minimum value
    pub fn with_min_value(mut self, value: PrimitiveValue) -> Self {
        self.min_value = Some(self.fit(value));
        self
    }

    /// Override the maximum value
    pub fn with_max_value(mut self, value: PrimitiveValue) -> Self {
        self.max_value = Some(self.fit(value));
        self
    }

    /// Set the character encoding
    pub fn with_character_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    /// Set the semantic type
    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    /// Set epoch and time unit of a timestamp
    pub fn with_time(mut self, epoch: impl Into<String>, unit: impl Into<String>) -> Self {
        self.epoch = Some(epoch.into());
        self.time_unit = Some(unit.into());
        self
    }

    fn primitive(&self) -> Result<PrimitiveType> {
        self.primitive_type
            .ok_or(Error::UnsupportedPrimitiveType(crate::primitive::NONE_CODE))
    }

    /// Null value override, or the primitive's default
    pub fn applicable_null_value(&self) -> Result<PrimitiveValue> {
        match &self.null_value {
            Some(value) => Ok(value.clone()),
            None => Ok(self.primitive()?.null_value()),
        }
    }

    /// Minimum value override, or the primitive's default
    pub fn applicable_min_value(&self) -> Result<PrimitiveValue> {
        match &self.min_value {
            Some(value) => Ok(value.clone()),
            None => Ok(self.primitive()?.min_value()),
        }
    }

    /// Maximum value override, or the primitive's default
    pub fn applicable_max_value(&self) -> Result<PrimitiveValue> {
        match &self.max_value {
            Some(value) => Ok(value.clone()),
            None => Ok(self.primitive()?.max_value()),
        }
    }
}

/// One entry of a flattened schema description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Structural role
    pub signal: Signal,
    /// Name of the field, type or construct
    pub name: String,
    /// Byte offset within the enclosing block, negative when not fixed
    pub offset: i32,
    /// Encoded size in bytes, negative when variable
    pub size: i32,
    /// Schema id of the field or message
    pub id: i32,
    /// Schema version that introduced the token
    pub version: i32,
    /// Primitive encoding
    pub encoding: Encoding,
}

impl Token {
    /// Token with zero offset/size/id/version and a default encoding
    pub fn new(signal: Signal, name: impl Into<String>) -> Self {
        Self {
            signal,
            name: name.into(),
            offset: 0,
            size: 0,
            id: 0,
            version: 0,
            encoding: Encoding::default(),
        }
    }

    /// Leaf encoding token of `ty` sized for one element
    pub fn encoding(name: impl Into<String>, ty: PrimitiveType) -> Self {
        Self::new(Signal::Encoding, name)
            .with_size(ty.size() as i32)
            .with_encoding(Encoding::new(ty))
    }

    /// Set the offset
    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the size
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    /// Set the schema id
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    /// Set the introducing version
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Replace the encoding
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Offset as a buffer index; negative offsets read as 0
    #[inline]
    pub fn block_offset(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(0)
    }

    /// Size as a byte count; negative sizes read as 0
    #[inline]
    pub fn encoded_length(&self) -> usize {
        usize::try_from(self.size).unwrap_or(0)
    }

    /// Number of primitive elements the token spans
    pub fn array_length(&self) -> usize {
        match self.encoding.primitive_type {
            Some(ty) if self.size > 0 => self.encoded_length() / ty.size(),
            _ => 1,
        }
    }

    /// True when the value has no wire storage
    #[inline]
    pub fn is_constant_encoding(&self) -> bool {
        self.encoding.presence == Presence::Constant
    }

    /// True when the value may carry the null marker
    #[inline]
    pub fn is_optional_encoding(&self) -> bool {
        self.encoding.presence == Presence::Optional
    }

    /// Primitive type or an error for structural tokens
    pub fn primitive_type(&self) -> Result<PrimitiveType> {
        self.encoding.primitive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_codes() {
        for code in 1..=17u8 {
            let signal = Signal::from_code(code).unwrap();
            assert_eq!(signal.code(), code);
        }
        assert_eq!(Signal::from_code(0), None);
        assert_eq!(Signal::from_code(18), None);
        assert_eq!(Signal::BeginGroup.end_of(), Some(Signal::EndGroup));
        assert!(Signal::EndVarData.is_end());
        assert!(!Signal::Encoding.is_end());
    }

    #[test]
    fn test_applicable_values_fall_back() {
        let encoding = Encoding::new(PrimitiveType::UInt8);
        assert_eq!(encoding.applicable_null_value().unwrap(), PrimitiveValue::UInt(255));
        assert_eq!(encoding.applicable_max_value().unwrap(), PrimitiveValue::UInt(254));

        let encoding = encoding.with_null_value(PrimitiveValue::UInt(0));
        assert_eq!(encoding.applicable_null_value().unwrap(), PrimitiveValue::UInt(0));

        assert!(Encoding::default().applicable_min_value().is_err());
    }

    #[test]
    fn test_token_helpers() {
        let token = Token::encoding("symbol", PrimitiveType::Char).with_size(8);
        assert_eq!(token.array_length(), 8);
        assert!(!token.is_constant_encoding());

        let token = Token::encoding("price", PrimitiveType::Int64).with_offset(-1);
        assert_eq!(token.array_length(), 1);
        assert_eq!(token.block_offset(), 0);

        let token = Token::encoding("venue", PrimitiveType::UInt8)
            .with_encoding(Encoding::new(PrimitiveType::UInt8).with_const_value(PrimitiveValue::UInt(3)));
        assert!(token.is_constant_encoding());
        assert!(!token.is_optional_encoding());
    }
}
