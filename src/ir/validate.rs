//! Structural validation of token streams
//!
//! Every walk in the decoder relies on the stream being well-nested and on the
//! fixed shapes of fields, groups and var-data constructs. Those properties are
//! checked here once, when an IR is built, so that decoding needs no checks of
//! its own.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::ir::token::{Presence, Signal, Token};

/// Name of the block length entry of a group dimension
pub const DIMENSION_BLOCK_LENGTH: &str = "blockLength";
/// Name of the repeat count entry of a group dimension
pub const DIMENSION_NUM_IN_GROUP: &str = "numInGroup";

/// Index of the token closing the construct opened at `begin`.
///
/// Nested constructs of the same kind are skipped.
pub fn find_matching_end(tokens: &[Token], begin: usize) -> Option<usize> {
    let open = tokens.get(begin)?.signal;
    let close = open.end_of()?;
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(begin) {
        if token.signal == open {
            depth += 1;
        } else if token.signal == close {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Indices of the `blockLength` and `numInGroup` encodings of the dimension
/// composite opened at `composite`.
///
/// Entries are matched by name; when the names are not present the first two
/// encodings of the composite are used.
pub fn dimension_indices(tokens: &[Token], composite: usize) -> Option<(usize, usize)> {
    let end = find_matching_end(tokens, composite)?;
    let members = &tokens[composite + 1..end];
    let by_name = |name: &str| {
        members
            .iter()
            .position(|t| t.signal == Signal::Encoding && t.name == name)
            .map(|p| composite + 1 + p)
    };

    match (by_name(DIMENSION_BLOCK_LENGTH), by_name(DIMENSION_NUM_IN_GROUP)) {
        (Some(block_length), Some(num_in_group)) => Some((block_length, num_in_group)),
        _ => {
            let first = composite + 1;
            let second = composite + 2;
            let is_encoding = |i: usize| i < end && tokens[i].signal == Signal::Encoding;
            (is_encoding(first) && is_encoding(second)).then_some((first, second))
        }
    }
}

struct Frame {
    signal: Signal,
    children: usize,
    // 0 = fields, 1 = groups, 2 = var data
    phase: u8,
}

fn malformed(index: usize, reason: &'static str) -> Error {
    Error::MalformedTokenStream { index, reason }
}

/// Check that `tokens` are well-nested and every construct has its expected
/// shape.
pub fn validate(tokens: &[Token]) -> Result<()> {
    let mut stack: Vec<Frame> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let signal = token.signal;

        if signal == Signal::Encoding {
            if token.encoding.primitive_type.is_none() {
                return Err(malformed(index, "encoding without primitive type"));
            }
            if token.offset < 0 {
                return Err(malformed(index, "encoding with negative offset"));
            }
        }
        if token.encoding.presence == Presence::Constant
            && token.encoding.const_value.is_none()
            && matches!(signal, Signal::Encoding | Signal::BeginEnum)
        {
            return Err(malformed(index, "constant without value"));
        }

        if signal.is_end() {
            let frame = stack.pop().ok_or_else(|| malformed(index, "unmatched end"))?;
            if frame.signal.end_of() != Some(signal) {
                return Err(malformed(index, "end does not match begin"));
            }
            match signal {
                Signal::EndField if frame.children != 1 => {
                    return Err(malformed(index, "field must hold exactly one type"))
                }
                Signal::EndGroup if frame.children == 0 => {
                    return Err(malformed(index, "group without dimension"))
                }
                Signal::EndVarData if frame.children != 1 => {
                    return Err(malformed(index, "var data must hold one composite"))
                }
                _ => {}
            }
            continue;
        }

        match stack.last_mut() {
            None => {
                if signal.end_of().is_none() {
                    return Err(malformed(index, "leaf token outside any construct"));
                }
            }
            Some(parent) => {
                check_child(tokens, index, parent)?;
                parent.children += 1;
            }
        }

        if signal.end_of().is_some() {
            stack.push(Frame {
                signal,
                children: 0,
                phase: 0,
            });
        }
    }

    if !stack.is_empty() {
        return Err(malformed(tokens.len(), "unterminated construct"));
    }
    Ok(())
}

/// Validate a single message span: one `BeginMessage` ... `EndMessage` pair
/// covering the whole slice.
pub fn validate_message(tokens: &[Token]) -> Result<()> {
    match tokens.first() {
        Some(token) if token.signal == Signal::BeginMessage => {}
        _ => return Err(malformed(0, "message must start with BeginMessage")),
    }
    validate(tokens)?;
    if find_matching_end(tokens, 0) != Some(tokens.len() - 1) {
        return Err(malformed(tokens.len() - 1, "message must end with EndMessage"));
    }
    Ok(())
}

fn check_child(tokens: &[Token], index: usize, parent: &mut Frame) -> Result<()> {
    let signal = tokens[index].signal;
    match parent.signal {
        Signal::BeginMessage | Signal::BeginGroup => {
            if parent.signal == Signal::BeginGroup && parent.children == 0 {
                if signal != Signal::BeginComposite || dimension_indices(tokens, index).is_none() {
                    return Err(malformed(index, "group must open with a dimension composite"));
                }
                return Ok(());
            }
            let phase = match signal {
                Signal::BeginField => 0,
                Signal::BeginGroup => 1,
                Signal::BeginVarData => 2,
                _ => return Err(malformed(index, "unexpected token in message body")),
            };
            if phase < parent.phase {
                return Err(malformed(index, "fields, groups and var data out of order"));
            }
            parent.phase = phase;
        }
        Signal::BeginField => {
            let is_type = matches!(
                signal,
                Signal::Encoding | Signal::BeginComposite | Signal::BeginEnum | Signal::BeginSet
            );
            if parent.children > 0 || !is_type {
                return Err(malformed(index, "field must hold exactly one type"));
            }
        }
        Signal::BeginComposite => {
            if !matches!(
                signal,
                Signal::Encoding | Signal::BeginComposite | Signal::BeginEnum | Signal::BeginSet
            ) {
                return Err(malformed(index, "unexpected token in composite"));
            }
        }
        Signal::BeginEnum => {
            if signal != Signal::ValidValue {
                return Err(malformed(index, "enum may only hold valid values"));
            }
        }
        Signal::BeginSet => {
            if signal != Signal::Choice {
                return Err(malformed(index, "set may only hold choices"));
            }
        }
        Signal::BeginVarData => {
            let shape = [
                Signal::BeginComposite,
                Signal::Encoding,
                Signal::Encoding,
                Signal::EndComposite,
                Signal::EndVarData,
            ];
            let matches_shape = parent.children == 0
                && tokens.len() >= index + shape.len()
                && tokens[index..index + shape.len()]
                    .iter()
                    .zip(shape.iter())
                    .all(|(token, expected)| token.signal == *expected);
            if !matches_shape {
                return Err(malformed(index, "var data must be length and data in a composite"));
            }
        }
        _ => return Err(malformed(index, "token inside a leaf construct")),
    }

    if matches!(signal, Signal::ValidValue | Signal::Choice) && tokens[index].encoding.const_value.is_none() {
        return Err(malformed(index, "valid value or choice without value"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::token::Encoding;
    use crate::primitive::{PrimitiveType, PrimitiveValue};
    use alloc::vec;

    fn field(name: &str, ty: PrimitiveType, offset: i32) -> Vec<Token> {
        vec![
            Token::new(Signal::BeginField, name),
            Token::encoding(name, ty).with_offset(offset),
            Token::new(Signal::EndField, name),
        ]
    }

    fn group(name: &str, body: Vec<Token>) -> Vec<Token> {
        let mut tokens = vec![
            Token::new(Signal::BeginGroup, name),
            Token::new(Signal::BeginComposite, "groupSizeEncoding").with_size(3),
            Token::encoding("blockLength", PrimitiveType::UInt16),
            Token::encoding("numInGroup", PrimitiveType::UInt8).with_offset(2),
            Token::new(Signal::EndComposite, "groupSizeEncoding"),
        ];
        tokens.extend(body);
        tokens.push(Token::new(Signal::EndGroup, name));
        tokens
    }

    fn message(body: Vec<Token>) -> Vec<Token> {
        let mut tokens = vec![Token::new(Signal::BeginMessage, "m")];
        tokens.extend(body);
        tokens.push(Token::new(Signal::EndMessage, "m"));
        tokens
    }

    #[test]
    fn test_find_matching_end_skips_nested() {
        let mut body = field("a", PrimitiveType::UInt8, 0);
        body.extend(group("outer", group("inner", field("b", PrimitiveType::UInt8, 0))));
        let tokens = message(body);

        assert_eq!(find_matching_end(&tokens, 0), Some(tokens.len() - 1));
        let outer = tokens.iter().position(|t| t.signal == Signal::BeginGroup).unwrap();
        assert_eq!(find_matching_end(&tokens, outer), Some(tokens.len() - 2));
        assert_eq!(dimension_indices(&tokens, outer + 1), Some((outer + 2, outer + 3)));
    }

    #[test]
    fn test_valid_message_passes() {
        let mut body = field("a", PrimitiveType::UInt8, 0);
        body.extend(group("g", field("b", PrimitiveType::UInt32, 0)));
        assert!(validate_message(&message(body)).is_ok());
    }

    #[test]
    fn test_unbalanced_streams_fail() {
        let mut tokens = message(field("a", PrimitiveType::UInt8, 0));
        tokens.remove(3);
        assert!(matches!(
            validate(&tokens),
            Err(Error::MalformedTokenStream { .. })
        ));

        let tokens = vec![Token::new(Signal::BeginMessage, "m"), Token::new(Signal::EndGroup, "m")];
        assert_eq!(
            validate(&tokens),
            Err(Error::MalformedTokenStream {
                index: 1,
                reason: "end does not match begin"
            })
        );
    }

    #[test]
    fn test_body_order_enforced() {
        let mut body = group("g", Vec::new());
        body.extend(field("late", PrimitiveType::UInt8, 0));
        assert!(validate_message(&message(body)).is_err());
    }

    #[test]
    fn test_group_needs_dimension() {
        let mut tokens = vec![Token::new(Signal::BeginGroup, "g")];
        tokens.extend(field("a", PrimitiveType::UInt8, 0));
        tokens.push(Token::new(Signal::EndGroup, "g"));
        assert!(validate_message(&message(tokens)).is_err());
    }

    #[test]
    fn test_enum_shape() {
        let tokens = message(vec![
            Token::new(Signal::BeginField, "side"),
            Token::new(Signal::BeginEnum, "Side").with_encoding(Encoding::new(PrimitiveType::UInt8)),
            Token::new(Signal::ValidValue, "Buy")
                .with_encoding(Encoding::new(PrimitiveType::UInt8).with_value(PrimitiveValue::UInt(1))),
            Token::new(Signal::EndEnum, "Side"),
            Token::new(Signal::EndField, "side"),
        ]);
        assert!(validate_message(&tokens).is_ok());

        let mut bad = tokens.clone();
        bad[3].encoding.const_value = None;
        assert!(validate_message(&bad).is_err());
    }

    #[test]
    fn test_constant_without_value_rejected() {
        let mut tokens = message(field("c", PrimitiveType::UInt8, 0));
        tokens[2].encoding.presence = Presence::Constant;
        assert!(validate_message(&tokens).is_err());
    }
}
