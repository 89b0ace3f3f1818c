//! Generic message decoder
//!
//! Walks a message's token list against a buffer and reports what it finds to
//! a [`TokenListener`]. Two cursors drive the walk: an index into the token
//! list and a byte index into the buffer. Both are threaded through return
//! values, so a decoder holds no state and can be shared freely.
//!
//! A message or group body is laid out as
//!
//! ```text
//! | fixed fields (block length) | groups ... | var data ... |
//! ```
//!
//! where each group repeats `numInGroup` times after its dimension header and
//! each iteration is itself a body.

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::validate::{dimension_indices, find_matching_end};
use crate::ir::{Signal, Token};
use crate::otf::listener::TokenListener;
use crate::otf::value::get_int;

/// Stateless decoder of messages described by token lists
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageDecoder;

fn end_of(tokens: &[Token], begin: usize) -> Result<usize> {
    find_matching_end(tokens, begin).ok_or(Error::MalformedTokenStream {
        index: begin,
        reason: "unterminated construct",
    })
}

fn to_usize(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Overflow)
}

/// Move the cursor `by` bytes, failing if it lands past the buffer
#[inline]
fn advance(buffer: &ByteView<'_>, buffer_index: usize, by: usize) -> Result<usize> {
    let limit = buffer_index.checked_add(by).ok_or(Error::Overflow)?;
    if limit > buffer.capacity() {
        return Err(Error::BufferOverflow {
            limit,
            capacity: buffer.capacity(),
        });
    }
    Ok(limit)
}

impl MessageDecoder {
    /// Decode the message whose root block starts at `buffer_index`.
    ///
    /// `block_length` is the root block length from the message header, so
    /// fields appended by newer schema versions are skipped. Returns the
    /// buffer index just past the message.
    ///
    /// `tokens` is expected to be a validated span such as one returned by
    /// [`IntermediateRepresentation::message`](crate::ir::IntermediateRepresentation::message).
    /// Spans of the wrong shape fail with [`Error::MalformedTokenStream`], and
    /// cursors that run past the buffer with [`Error::BufferOverflow`].
    pub fn decode<L: TokenListener + ?Sized>(
        buffer: &ByteView<'_>,
        buffer_index: usize,
        acting_version: i32,
        block_length: usize,
        tokens: &[Token],
        listener: &mut L,
    ) -> Result<usize> {
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last))
                if first.signal == Signal::BeginMessage && last.signal == Signal::EndMessage => {}
            _ => {
                return Err(Error::MalformedTokenStream {
                    index: 0,
                    reason: "message must be BeginMessage ... EndMessage",
                })
            }
        }
        let end = tokens.len() - 1;

        listener.on_begin_message(&tokens[0])?;
        let buffer_index = decode_body(
            buffer,
            buffer_index,
            acting_version,
            block_length,
            tokens,
            1,
            end,
            listener,
        )?;
        listener.on_end_message(&tokens[end])?;

        Ok(buffer_index)
    }
}

/// Decode the body in `tokens[from..to]`: fields, then groups, then var data
#[allow(clippy::too_many_arguments)]
fn decode_body<L: TokenListener + ?Sized>(
    buffer: &ByteView<'_>,
    mut buffer_index: usize,
    acting_version: i32,
    block_length: usize,
    tokens: &[Token],
    from: usize,
    to: usize,
    listener: &mut L,
) -> Result<usize> {
    let mut groups_begin = to;
    let mut var_data_begin = to;
    let mut index = from;
    while index < to {
        match tokens[index].signal {
            Signal::BeginGroup if groups_begin == to => groups_begin = index,
            Signal::BeginVarData if var_data_begin == to => var_data_begin = index,
            _ => {}
        }
        index = end_of(tokens, index)? + 1;
    }
    let fields_end = groups_begin.min(var_data_begin);
    let groups_end = var_data_begin.max(groups_begin);

    decode_fields(buffer, buffer_index, acting_version, tokens, from, fields_end, listener)?;
    buffer_index = advance(buffer, buffer_index, block_length)?;

    buffer_index = decode_groups(buffer, buffer_index, acting_version, tokens, groups_begin, groups_end, listener)?;
    decode_var_data(buffer, buffer_index, acting_version, tokens, var_data_begin, to, listener)
}

fn decode_fields<L: TokenListener + ?Sized>(
    buffer: &ByteView<'_>,
    buffer_index: usize,
    acting_version: i32,
    tokens: &[Token],
    from: usize,
    to: usize,
    listener: &mut L,
) -> Result<()> {
    let mut index = from;
    while index < to {
        let field_end = end_of(tokens, index)?;
        let field = &tokens[index];
        let type_index = index + 1;
        let type_token = &tokens[type_index];
        let offset = buffer_index + type_token.block_offset();

        match type_token.signal {
            Signal::Encoding => listener.on_encoding(field, buffer, offset, type_token, acting_version)?,
            Signal::BeginComposite => {
                let end = end_of(tokens, type_index)?;
                decode_composite(field, buffer, offset, acting_version, tokens, type_index, end, listener)?;
            }
            Signal::BeginEnum => {
                let end = end_of(tokens, type_index)?;
                listener.on_enum(field, buffer, offset, &tokens[type_index..=end], acting_version)?;
            }
            Signal::BeginSet => {
                let end = end_of(tokens, type_index)?;
                listener.on_bit_set(field, buffer, offset, &tokens[type_index..=end], acting_version)?;
            }
            _ => {}
        }
        index = field_end + 1;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_composite<L: TokenListener + ?Sized>(
    field: &Token,
    buffer: &ByteView<'_>,
    buffer_index: usize,
    acting_version: i32,
    tokens: &[Token],
    begin: usize,
    end: usize,
    listener: &mut L,
) -> Result<()> {
    let span = &tokens[begin..=end];
    listener.on_begin_composite(field, span)?;

    let mut index = begin + 1;
    while index < end {
        let member = &tokens[index];
        let offset = buffer_index + member.block_offset();
        match member.signal {
            Signal::Encoding => {
                listener.on_encoding(member, buffer, offset, member, acting_version)?;
                index += 1;
            }
            Signal::BeginComposite => {
                let member_end = end_of(tokens, index)?;
                decode_composite(member, buffer, offset, acting_version, tokens, index, member_end, listener)?;
                index = member_end + 1;
            }
            Signal::BeginEnum => {
                let member_end = end_of(tokens, index)?;
                listener.on_enum(member, buffer, offset, &tokens[index..=member_end], acting_version)?;
                index = member_end + 1;
            }
            Signal::BeginSet => {
                let member_end = end_of(tokens, index)?;
                listener.on_bit_set(member, buffer, offset, &tokens[index..=member_end], acting_version)?;
                index = member_end + 1;
            }
            _ => index += 1,
        }
    }

    listener.on_end_composite(field, span)
}

fn decode_groups<L: TokenListener + ?Sized>(
    buffer: &ByteView<'_>,
    mut buffer_index: usize,
    acting_version: i32,
    tokens: &[Token],
    from: usize,
    to: usize,
    listener: &mut L,
) -> Result<usize> {
    let mut index = from;
    while index < to {
        let group = &tokens[index];
        let group_end = end_of(tokens, index)?;
        if group.signal != Signal::BeginGroup {
            index = group_end + 1;
            continue;
        }

        // absent from messages encoded before the group existed
        if acting_version < group.version {
            index = group_end + 1;
            continue;
        }

        let dimension = index + 1;
        let dimension_end = end_of(tokens, dimension)?;
        let (block_length_at, num_in_group_at) =
            dimension_indices(tokens, dimension).ok_or(Error::MalformedTokenStream {
                index: dimension,
                reason: "group dimension lacks blockLength/numInGroup",
            })?;

        let block_length = read_dimension(buffer, buffer_index, &tokens[block_length_at])?;
        let num_in_group = read_dimension(buffer, buffer_index, &tokens[num_in_group_at])?;
        buffer_index = advance(buffer, buffer_index, tokens[dimension].encoded_length())?;

        listener.on_group_header(group, num_in_group)?;
        for group_index in 0..num_in_group {
            listener.on_begin_group(group, group_index, num_in_group)?;
            buffer_index = decode_body(
                buffer,
                buffer_index,
                acting_version,
                block_length,
                tokens,
                dimension_end + 1,
                group_end,
                listener,
            )?;
            listener.on_end_group(group, group_index, num_in_group)?;
        }

        index = group_end + 1;
    }
    Ok(buffer_index)
}

#[inline]
fn read_dimension(buffer: &ByteView<'_>, buffer_index: usize, token: &Token) -> Result<usize> {
    let value = get_int(
        buffer,
        buffer_index + token.block_offset(),
        token.primitive_type()?,
        token.encoding.byte_order,
    )?;
    to_usize(value)
}

fn decode_var_data<L: TokenListener + ?Sized>(
    buffer: &ByteView<'_>,
    mut buffer_index: usize,
    acting_version: i32,
    tokens: &[Token],
    from: usize,
    to: usize,
    listener: &mut L,
) -> Result<usize> {
    let mut index = from;
    while index < to {
        let field = &tokens[index];
        let field_end = end_of(tokens, index)?;
        if field.signal != Signal::BeginVarData || acting_version < field.version {
            index = field_end + 1;
            continue;
        }

        let (length_token, data_token) = match (tokens.get(index + 2), tokens.get(index + 3)) {
            (Some(length), Some(data))
                if index + 3 < field_end
                    && length.signal == Signal::Encoding
                    && data.signal == Signal::Encoding =>
            {
                (length, data)
            }
            _ => {
                return Err(Error::MalformedTokenStream {
                    index,
                    reason: "var data lacks length and data encodings",
                })
            }
        };
        let length_type = length_token.primitive_type()?;
        let raw = buffer.get_primitive(
            buffer_index + length_token.block_offset(),
            length_type,
            length_token.encoding.byte_order,
        )?;
        let length = if raw == length_token.encoding.applicable_null_value()? {
            0
        } else {
            to_usize(get_int(
                buffer,
                buffer_index + length_token.block_offset(),
                length_type,
                length_token.encoding.byte_order,
            )?)?
        };

        let data_index = advance(buffer, buffer_index, data_token.block_offset())?;
        buffer_index = advance(buffer, data_index, length)?;
        listener.on_var_data(field, buffer, data_index, length, data_token)?;

        index = field_end + 1;
    }
    Ok(buffer_index)
}
