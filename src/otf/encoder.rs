//! Generic message encoder
//!
//! The write-side mirror of [`MessageDecoder`](crate::otf::MessageDecoder):
//! fields are located by name in a message or group token span and written at
//! their schema offsets. Each write asks the buffer to cover the bytes it is
//! about to touch first, so a growable [`ByteView`] extends on demand.

use alloc::string::ToString;

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::validate::{dimension_indices, find_matching_end};
use crate::ir::{Signal, Token};
use crate::otf::bitset::ChoiceSet;
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Writer for one message or group span
#[derive(Debug, Clone, Copy)]
pub struct MessageEncoder<'t> {
    tokens: &'t [Token],
    body: usize,
}

fn end_of(tokens: &[Token], begin: usize) -> Result<usize> {
    find_matching_end(tokens, begin).ok_or(Error::MalformedTokenStream {
        index: begin,
        reason: "unterminated construct",
    })
}

fn unknown(name: &str) -> Error {
    Error::UnknownFieldName(name.to_string())
}

/// Write `value` as described by `token` at `index`, zero-padding short
/// character arrays. Constants have no storage and are skipped.
fn write_encoded(buffer: &mut ByteView<'_>, index: usize, token: &Token, value: &PrimitiveValue) -> Result<()> {
    if token.is_constant_encoding() {
        return Ok(());
    }
    let ty = token.primitive_type()?;
    let size = token.encoded_length().max(ty.size());
    let len = value.encoded_len(ty);
    if len > size {
        return Err(Error::IncompatibleValue(ty));
    }

    buffer.check_limit(index.checked_add(size).ok_or(Error::Overflow)?)?;
    buffer.put_primitive(index, value, ty, token.encoding.byte_order)?;
    for pad in index + len..index + size {
        buffer.put_u8(pad, 0)?;
    }
    Ok(())
}

impl<'t> MessageEncoder<'t> {
    /// Encoder for a `BeginMessage` or `BeginGroup` span
    pub fn new(tokens: &'t [Token]) -> Result<Self> {
        let malformed = Error::MalformedTokenStream {
            index: 0,
            reason: "encoder needs a message or group span",
        };
        let first = tokens.first().ok_or_else(|| malformed.clone())?;
        if end_of(tokens, 0)? != tokens.len() - 1 {
            return Err(malformed);
        }
        let body = match first.signal {
            Signal::BeginMessage => 1,
            Signal::BeginGroup => end_of(tokens, 1)? + 1,
            _ => return Err(malformed),
        };
        Ok(Self { tokens, body })
    }

    /// Block length declared by the span
    #[inline]
    pub fn block_length(&self) -> usize {
        self.tokens[0].encoded_length()
    }

    /// Tokens of the span
    #[inline]
    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }

    fn lookup(&self, signal: Signal, name: &str) -> Result<usize> {
        let end = self.tokens.len() - 1;
        let mut index = self.body;
        while index < end {
            let token = &self.tokens[index];
            if token.signal == signal && token.name == name {
                return Ok(index);
            }
            index = end_of(self.tokens, index)? + 1;
        }
        Err(unknown(name))
    }

    fn field_type(&self, name: &str) -> Result<(usize, &'t Token)> {
        let field = self.lookup(Signal::BeginField, name)?;
        Ok((field + 1, &self.tokens[field + 1]))
    }

    /// Write a primitive, enum discriminant or raw set bits field of the block
    /// starting at `block_index`
    pub fn put_field(&self, buffer: &mut ByteView<'_>, block_index: usize, name: &str, value: &PrimitiveValue) -> Result<()> {
        let (type_index, type_token) = self.field_type(name)?;
        if type_token.signal == Signal::BeginComposite {
            return Err(Error::MalformedTokenStream {
                index: type_index,
                reason: "composite field needs a member name",
            });
        }
        write_encoded(buffer, block_index + type_token.block_offset(), type_token, value)
    }

    /// Write an enum field by the name of one of its valid values
    pub fn put_enum(&self, buffer: &mut ByteView<'_>, block_index: usize, name: &str, value_name: &str) -> Result<()> {
        let (type_index, type_token) = self.field_type(name)?;
        let end = end_of(self.tokens, type_index)?;
        let value = self.tokens[type_index..end]
            .iter()
            .find(|t| t.signal == Signal::ValidValue && t.name == value_name)
            .and_then(|t| t.encoding.const_value.as_ref())
            .ok_or_else(|| unknown(value_name))?;
        write_encoded(buffer, block_index + type_token.block_offset(), type_token, value)
    }

    /// Write a set field with the named choices set
    pub fn put_choices(&self, buffer: &mut ByteView<'_>, block_index: usize, name: &str, choices: &[&str]) -> Result<()> {
        let (type_index, type_token) = self.field_type(name)?;
        let end = end_of(self.tokens, type_index)?;
        let span = &self.tokens[type_index..end];

        let mut set = ChoiceSet::new(type_token.primitive_type()?);
        for choice in choices {
            let token = span
                .iter()
                .find(|t| t.signal == Signal::Choice && t.name == *choice)
                .ok_or_else(|| unknown(choice))?;
            set.choose(token)?;
        }
        write_encoded(
            buffer,
            block_index + type_token.block_offset(),
            type_token,
            &PrimitiveValue::UInt(set.bits()),
        )
    }

    /// Write one direct member of a composite field
    pub fn put_composite_member(
        &self,
        buffer: &mut ByteView<'_>,
        block_index: usize,
        name: &str,
        member: &str,
        value: &PrimitiveValue,
    ) -> Result<()> {
        let (type_index, composite) = self.field_type(name)?;
        if composite.signal != Signal::BeginComposite {
            return Err(unknown(member));
        }
        let end = end_of(self.tokens, type_index)?;

        let mut index = type_index + 1;
        while index < end {
            let token = &self.tokens[index];
            if token.name == member && token.signal == Signal::Encoding {
                let at = block_index + composite.block_offset() + token.block_offset();
                return write_encoded(buffer, at, token, value);
            }
            index = match token.signal {
                Signal::Encoding => index + 1,
                _ => end_of(self.tokens, index)? + 1,
            };
        }
        Err(unknown(member))
    }

    /// Encoder for a group of this span
    pub fn group(&self, name: &str) -> Result<MessageEncoder<'t>> {
        let begin = self.lookup(Signal::BeginGroup, name)?;
        let end = end_of(self.tokens, begin)?;
        MessageEncoder::new(&self.tokens[begin..=end])
    }

    /// Write this group's dimension header at `index`; returns the index of
    /// the first iteration
    pub fn put_dimensions(&self, buffer: &mut ByteView<'_>, index: usize, num_in_group: usize) -> Result<usize> {
        if self.tokens[0].signal != Signal::BeginGroup {
            return Err(Error::MalformedTokenStream {
                index: 0,
                reason: "dimensions belong to groups",
            });
        }
        let (block_length_at, num_in_group_at) =
            dimension_indices(self.tokens, 1).ok_or(Error::MalformedTokenStream {
                index: 1,
                reason: "group dimension lacks blockLength/numInGroup",
            })?;
        let block_length = &self.tokens[block_length_at];
        let count = &self.tokens[num_in_group_at];

        let limit = count.encoding.applicable_max_value()?.as_u64().ok_or(Error::Overflow)?;
        if num_in_group as u64 > limit {
            return Err(Error::Overflow);
        }

        let end = index
            .checked_add(self.tokens[1].encoded_length())
            .ok_or(Error::Overflow)?;
        buffer.check_limit(end)?;
        write_encoded(
            buffer,
            index + block_length.block_offset(),
            block_length,
            &PrimitiveValue::UInt(self.block_length() as u64),
        )?;
        write_encoded(
            buffer,
            index + count.block_offset(),
            count,
            &PrimitiveValue::UInt(num_in_group as u64),
        )?;
        Ok(end)
    }

    /// Write a var-data field at `index`; returns the index just past it
    pub fn put_var_data(&self, buffer: &mut ByteView<'_>, index: usize, name: &str, bytes: &[u8]) -> Result<usize> {
        let begin = self.lookup(Signal::BeginVarData, name)?;
        let length = &self.tokens[begin + 2];
        let data = &self.tokens[begin + 3];
        let length_type = length.primitive_type()?;

        let max = match length.encoding.applicable_max_value()? {
            PrimitiveValue::Int(v) => u64::try_from(v).map_err(|_| Error::Overflow)?,
            other => other.as_u64().ok_or(Error::IncompatibleValue(length_type))?,
        };
        if bytes.len() as u64 > max {
            return Err(Error::Overflow);
        }

        let data_index = index + data.block_offset();
        let end = data_index.checked_add(bytes.len()).ok_or(Error::Overflow)?;
        buffer.check_limit(end)?;
        buffer.put_primitive(
            index + length.block_offset(),
            &PrimitiveValue::UInt(bytes.len() as u64),
            length_type,
            length.encoding.byte_order,
        )?;
        buffer.put_bytes(data_index, bytes)?;
        Ok(end)
    }
}

/// Primitive type of the named field's encoding, for callers building values
pub fn field_primitive_type(tokens: &[Token], name: &str) -> Result<PrimitiveType> {
    let encoder = MessageEncoder::new(tokens)?;
    let (_, type_token) = encoder.field_type(name)?;
    type_token.primitive_type()
}
