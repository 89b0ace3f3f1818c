//! Value resolution for listeners
//!
//! These helpers turn the `(buffer, index, token)` triples handed to a
//! [`TokenListener`](crate::otf::TokenListener) into values, applying constant
//! presence and acting-version gating before touching the buffer.

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::{ByteOrder, Signal, Token};
use crate::otf::bitset::ChoiceSet;
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Read any integer primitive as `i64`.
///
/// Unsigned 64-bit values above `i64::MAX` fail with [`Error::Overflow`];
/// floating point types are rejected.
pub fn get_int(buffer: &ByteView<'_>, index: usize, ty: PrimitiveType, order: ByteOrder) -> Result<i64> {
    if ty.is_floating_point() {
        return Err(Error::UnsupportedPrimitiveType(ty.code()));
    }
    match buffer.get_primitive(index, ty, order)? {
        PrimitiveValue::UInt(v) => i64::try_from(v).map_err(|_| Error::Overflow),
        other => other.as_i64().ok_or(Error::IncompatibleValue(ty)),
    }
}

fn constant(token: &Token) -> Result<PrimitiveValue> {
    token
        .encoding
        .const_value
        .clone()
        .ok_or(Error::MalformedTokenStream {
            index: 0,
            reason: "constant without value",
        })
}

/// Resolve the value of an encoding token located at `index`.
///
/// Constants come from the schema. Tokens newer than `acting_version`
/// resolve to their null value without reading. Character arrays resolve to
/// their bytes; other arrays resolve to their first element.
pub fn resolve_value(
    buffer: &ByteView<'_>,
    index: usize,
    token: &Token,
    acting_version: i32,
) -> Result<PrimitiveValue> {
    let ty = token.primitive_type()?;
    if token.is_constant_encoding() {
        return constant(token);
    }
    if acting_version < token.version {
        return token.encoding.applicable_null_value();
    }
    if ty == PrimitiveType::Char && token.array_length() > 1 {
        let bytes = buffer.slice(index, token.encoded_length())?;
        return Ok(PrimitiveValue::Bytes(bytes.to_vec()));
    }
    buffer.get_primitive(index, ty, token.encoding.byte_order)
}

/// Resolve element `element` of an array encoding located at `index`
pub fn resolve_element(
    buffer: &ByteView<'_>,
    index: usize,
    token: &Token,
    element: usize,
    acting_version: i32,
) -> Result<PrimitiveValue> {
    let ty = token.primitive_type()?;
    if element >= token.array_length() {
        return Err(Error::Overflow);
    }
    if token.is_constant_encoding() {
        return match constant(token)? {
            PrimitiveValue::Bytes(bytes) => bytes
                .get(element)
                .map(|&c| PrimitiveValue::Char(c))
                .ok_or(Error::Overflow),
            value => Ok(value),
        };
    }
    if acting_version < token.version {
        return token.encoding.applicable_null_value();
    }
    buffer.get_primitive(index + element * ty.size(), ty, token.encoding.byte_order)
}

fn same_value(a: &PrimitiveValue, b: &PrimitiveValue) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Find the `ValidValue` matching the enum located at `index`.
///
/// `tokens` spans `BeginEnum` ... `EndEnum`. Returns `None` when the stored
/// value (or the null value of a gated field) names no valid value.
pub fn resolve_enum<'t>(
    buffer: &ByteView<'_>,
    index: usize,
    tokens: &'t [Token],
    acting_version: i32,
) -> Result<Option<&'t Token>> {
    let begin = tokens.first().ok_or(Error::MalformedTokenStream {
        index: 0,
        reason: "empty enum span",
    })?;
    let value = resolve_value(buffer, index, begin, acting_version)?;

    Ok(tokens
        .iter()
        .filter(|t| t.signal == Signal::ValidValue)
        .find(|t| {
            t.encoding
                .const_value
                .as_ref()
                .map_or(false, |v| same_value(v, &value))
        }))
}

/// Read the bit set located at `index`; `tokens` spans `BeginSet` ... `EndSet`.
///
/// A set newer than `acting_version` resolves to the empty set.
pub fn resolve_choices(
    buffer: &ByteView<'_>,
    index: usize,
    tokens: &[Token],
    acting_version: i32,
) -> Result<ChoiceSet> {
    let begin = tokens.first().ok_or(Error::MalformedTokenStream {
        index: 0,
        reason: "empty set span",
    })?;
    let ty = begin.primitive_type()?;
    if acting_version < begin.version {
        return Ok(ChoiceSet::new(ty));
    }
    ChoiceSet::decode(buffer, index, ty, begin.encoding.byte_order)
}

/// `Choice` tokens whose bits are set in `set`
pub fn chosen<'t>(set: &ChoiceSet, tokens: &'t [Token]) -> impl Iterator<Item = &'t Token> + 't {
    let set = *set;
    tokens
        .iter()
        .filter(move |t| t.signal == Signal::Choice && set.is_chosen(t))
}
