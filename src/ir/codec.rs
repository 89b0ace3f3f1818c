//! Bootstrap wire format of the intermediate representation
//!
//! ```text
//! Frame:  | irVersion i32 | schemaVersion i32 | len u8 | packageName |
//! Token:  | offset i32 | size i32 | id i32 | version i32 |
//!         | signal u8 | primitiveType u8 | byteOrder u8 | presence u8 |
//!         | name | const | min | max | null |
//!         | characterEncoding | epoch | timeUnit | semanticType |
//! ```
//!
//! All integers are little-endian. Every string is a `u8` length followed by
//! that many bytes; value fields hold the primitive's little-endian bytes. An
//! empty string decodes as absent. Token records repeat until the input ends.

use alloc::string::String;
use alloc::vec::Vec;

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::repr::IntermediateRepresentation;
use crate::ir::token::{ByteOrder, Encoding, Presence, Signal, Token};
use crate::ir::validate::find_matching_end;
use crate::primitive::{PrimitiveType, PrimitiveValue, NONE_CODE};

/// Version of the bootstrap format written and accepted by this codec
pub const IR_VERSION: i32 = 0;

/// Size of the fixed part of a token record
pub const TOKEN_BLOCK_LENGTH: usize = 20;

/// Longest string a record can carry
pub const MAX_STRING_LENGTH: usize = u8::MAX as usize;

const INITIAL_CAPACITY: usize = 4096;

/// Leading record of an encoded IR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFrame {
    /// Bootstrap format version
    pub ir_version: i32,
    /// Version of the described schema
    pub schema_version: i32,
    /// Package the schema belongs to
    pub package_name: String,
}

impl IrFrame {
    /// Frame for a schema at the current bootstrap version
    pub fn new(schema_version: i32, package_name: impl Into<String>) -> Self {
        Self {
            ir_version: IR_VERSION,
            schema_version,
            package_name: package_name.into(),
        }
    }

    /// Reject frames written by another bootstrap version
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.ir_version != IR_VERSION {
            return Err(Error::UnsupportedIrVersion(self.ir_version));
        }
        Ok(())
    }

    fn encode(&self, writer: &mut IrWriter) -> Result<()> {
        writer.put_i32(self.ir_version)?;
        writer.put_i32(self.schema_version)?;
        writer.put_str(&self.package_name)
    }

    fn decode(reader: &mut IrReader<'_>) -> Result<Self> {
        let frame = Self {
            ir_version: reader.get_i32()?,
            schema_version: reader.get_i32()?,
            package_name: reader.get_str()?.unwrap_or_default(),
        };
        frame.validate()?;
        Ok(frame)
    }
}

struct IrWriter {
    view: ByteView<'static>,
    pos: usize,
}

impl IrWriter {
    fn new() -> Self {
        Self {
            view: ByteView::growable(INITIAL_CAPACITY),
            pos: 0,
        }
    }

    #[inline]
    fn reserve(&mut self, len: usize) -> Result<()> {
        let limit = self.pos.checked_add(len).ok_or(Error::Overflow)?;
        self.view.check_limit(limit)
    }

    #[inline]
    fn put_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.view.put_u8(self.pos, value)?;
        self.pos += 1;
        Ok(())
    }

    #[inline]
    fn put_i32(&mut self, value: i32) -> Result<()> {
        self.reserve(4)?;
        self.view.put_i32_le(self.pos, value)?;
        self.pos += 4;
        Ok(())
    }

    fn put_var_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u8::try_from(bytes.len()).map_err(|_| Error::Overflow)?;
        self.put_u8(len)?;
        self.reserve(bytes.len())?;
        self.pos += self.view.put_bytes(self.pos, bytes)?;
        Ok(())
    }

    #[inline]
    fn put_str(&mut self, text: &str) -> Result<()> {
        self.put_var_bytes(text.as_bytes())
    }

    fn put_opt_str(&mut self, text: &Option<String>) -> Result<()> {
        self.put_str(text.as_deref().unwrap_or(""))
    }

    fn put_value(&mut self, index: usize, value: &Option<PrimitiveValue>, ty: Option<PrimitiveType>) -> Result<()> {
        let value = match value {
            Some(value) => value,
            None => return self.put_u8(0),
        };
        let ty = ty.ok_or(Error::MalformedTokenStream {
            index,
            reason: "value on a token without primitive type",
        })?;

        if !value.is_exact_for(ty) {
            return Err(Error::IncompatibleValue(ty));
        }
        let mut scratch = ByteView::with_capacity(value.encoded_len(ty));
        scratch.put_primitive(0, value, ty, ByteOrder::LittleEndian)?;
        self.put_var_bytes(scratch.as_slice())
    }

    fn into_vec(self) -> Vec<u8> {
        let mut bytes = self.view.into_vec();
        bytes.truncate(self.pos);
        bytes
    }
}

struct IrReader<'a> {
    view: ByteView<'a>,
    pos: usize,
}

impl<'a> IrReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            view: ByteView::new(bytes),
            pos: 0,
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.view.capacity()
    }

    #[inline]
    fn get_u8(&mut self) -> Result<u8> {
        let value = self.view.get_u8(self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    #[inline]
    fn get_i32(&mut self) -> Result<i32> {
        let value = self.view.get_i32_le(self.pos)?;
        self.pos += 4;
        Ok(value)
    }

    fn get_var_bytes(&mut self) -> Result<&[u8]> {
        let len = self.get_u8()? as usize;
        let start = self.pos;
        self.pos += len;
        self.view.slice(start, len)
    }

    fn get_str(&mut self) -> Result<Option<String>> {
        let bytes = self.get_var_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        core::str::from_utf8(bytes)
            .map(|text| Some(String::from(text)))
            .map_err(|_| Error::InvalidUtf8)
    }

    fn get_value(&mut self, index: usize, ty: Option<PrimitiveType>) -> Result<Option<PrimitiveValue>> {
        let bytes = self.get_var_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let ty = ty.ok_or(Error::MalformedTokenStream {
            index,
            reason: "value on a token without primitive type",
        })?;

        if bytes.len() == ty.size() {
            return ByteView::new(bytes)
                .get_primitive(0, ty, ByteOrder::LittleEndian)
                .map(Some);
        }
        match ty {
            PrimitiveType::Char => Ok(Some(PrimitiveValue::Bytes(bytes.to_vec()))),
            _ => Err(Error::IncompatibleValue(ty)),
        }
    }
}

fn encode_token(writer: &mut IrWriter, index: usize, token: &Token) -> Result<()> {
    let encoding = &token.encoding;
    let ty = encoding.primitive_type;

    writer.put_i32(token.offset)?;
    writer.put_i32(token.size)?;
    writer.put_i32(token.id)?;
    writer.put_i32(token.version)?;
    writer.put_u8(token.signal.code())?;
    writer.put_u8(ty.map_or(NONE_CODE, |t| t.code()))?;
    writer.put_u8(encoding.byte_order.code())?;
    writer.put_u8(encoding.presence.code())?;

    writer.put_str(&token.name)?;
    writer.put_value(index, &encoding.const_value, ty)?;
    writer.put_value(index, &encoding.min_value, ty)?;
    writer.put_value(index, &encoding.max_value, ty)?;
    writer.put_value(index, &encoding.null_value, ty)?;
    writer.put_opt_str(&encoding.character_encoding)?;
    writer.put_opt_str(&encoding.epoch)?;
    writer.put_opt_str(&encoding.time_unit)?;
    writer.put_opt_str(&encoding.semantic_type)
}

fn decode_token(reader: &mut IrReader<'_>, index: usize) -> Result<Token> {
    let offset = reader.get_i32()?;
    let size = reader.get_i32()?;
    let id = reader.get_i32()?;
    let version = reader.get_i32()?;

    let signal = Signal::from_code(reader.get_u8()?).ok_or(Error::MalformedTokenStream {
        index,
        reason: "unknown signal code",
    })?;
    let ty = PrimitiveType::from_code(reader.get_u8()?)?;
    let byte_order = ByteOrder::from_code(reader.get_u8()?).ok_or(Error::MalformedTokenStream {
        index,
        reason: "unknown byte order code",
    })?;
    let presence = Presence::from_code(reader.get_u8()?).ok_or(Error::MalformedTokenStream {
        index,
        reason: "unknown presence code",
    })?;

    let name = reader.get_str()?.unwrap_or_default();
    let encoding = Encoding {
        primitive_type: ty,
        presence,
        byte_order,
        const_value: reader.get_value(index, ty)?,
        min_value: reader.get_value(index, ty)?,
        max_value: reader.get_value(index, ty)?,
        null_value: reader.get_value(index, ty)?,
        character_encoding: reader.get_str()?,
        epoch: reader.get_str()?,
        time_unit: reader.get_str()?,
        semantic_type: reader.get_str()?,
    };

    Ok(Token {
        signal,
        name,
        offset,
        size,
        id,
        version,
        encoding,
    })
}

/// Serializes an IR into bootstrap bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct IrEncoder;

impl IrEncoder {
    /// Encode the header followed by every message in registration order
    pub fn encode(ir: &IntermediateRepresentation) -> Result<Vec<u8>> {
        let mut writer = IrWriter::new();
        IrFrame::new(ir.version(), ir.package_name()).encode(&mut writer)?;

        let mut index = 0usize;
        let header = ir.header_structure().tokens().iter();
        let messages = ir.messages().flat_map(|(_, tokens)| tokens.iter());
        for token in header.chain(messages) {
            encode_token(&mut writer, index, token)?;
            index += 1;
        }

        log::debug!(
            "encoded IR package={} version={} messages={} tokens={}",
            ir.package_name(),
            ir.version(),
            ir.message_count(),
            index
        );
        Ok(writer.into_vec())
    }
}

/// Rebuilds an IR from bootstrap bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct IrDecoder;

impl IrDecoder {
    /// Decode the raw token stream without assembling an IR
    pub fn decode_tokens(bytes: &[u8]) -> Result<(IrFrame, Vec<Token>)> {
        let mut reader = IrReader::new(bytes);
        let frame = IrFrame::decode(&mut reader)?;

        let mut tokens = Vec::new();
        while !reader.is_at_end() {
            let token = decode_token(&mut reader, tokens.len())?;
            tokens.push(token);
        }
        Ok((frame, tokens))
    }

    /// Decode and assemble an IR.
    ///
    /// The leading composite is the header; every message span after it is
    /// keyed by the id of its closing token.
    pub fn decode(bytes: &[u8]) -> Result<IntermediateRepresentation> {
        let (frame, tokens) = Self::decode_tokens(bytes)?;

        let header_end = match tokens.first() {
            Some(token) if token.signal == Signal::BeginComposite => find_matching_end(&tokens, 0),
            _ => None,
        }
        .ok_or(Error::MalformedTokenStream {
            index: 0,
            reason: "stream must open with the header composite",
        })?;

        let mut ir = IntermediateRepresentation::new(
            frame.package_name,
            frame.schema_version,
            tokens[..=header_end].to_vec(),
        )?;

        let mut index = header_end + 1;
        while index < tokens.len() {
            if tokens[index].signal != Signal::BeginMessage {
                return Err(Error::MalformedTokenStream {
                    index,
                    reason: "expected BeginMessage",
                });
            }
            let end = find_matching_end(&tokens, index).ok_or(Error::MalformedTokenStream {
                index,
                reason: "unterminated message",
            })?;
            ir.add_message(tokens[end].id as i64, tokens[index..=end].to_vec())?;
            index = end + 1;
        }

        log::debug!(
            "decoded IR package={} version={} messages={} tokens={}",
            ir.package_name(),
            ir.version(),
            ir.message_count(),
            tokens.len()
        );
        Ok(ir)
    }
}
