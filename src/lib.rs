//! sbe-otf: schema-driven binary message codec core
//!
//! This crate decodes and encodes binary messages described by a schema
//! intermediate representation (IR) at runtime, without per-message generated
//! code. The IR is a flat, well-nested list of [`Token`]s; the decoder walks it
//! against a zero-copy [`ByteView`] and reports fields, composites, enums, bit
//! sets, repeating groups and variable length data to a [`TokenListener`].
//!
//! # Message Layout
//!
//! ```text
//! +----------------------+------------------------+---------+------------+
//! | Header (schema-def.) | Root block (blockLen)  | Groups  | Var data   |
//! +----------------------+------------------------+---------+------------+
//! Group:    | dimension (blockLength, numInGroup) | numInGroup x body |
//! Var data: | length | bytes |
//! ```
//!
//! # Features
//!
//! - Bounds-checked, endian-aware primitive access over borrowed or owned bytes
//! - Optional growth of write buffers through an overflow handler
//! - Bootstrap wire format to ship the IR itself (`lz4` envelope optional)
//! - Header fields resolved from the schema, never from fixed offsets
//! - Acting-version gating of fields added by newer schema versions
//! - JSON rendering of decoded messages (`json` feature)
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use sbe_otf::ir::{IntermediateRepresentation, Signal, Token};
//! use sbe_otf::otf::{HeaderDecoder, HeaderEncoder, MessageDecoder, MessageEncoder, MessageHeader, TokenListener};
//! use sbe_otf::primitive::{PrimitiveType, PrimitiveValue};
//! use sbe_otf::ByteView;
//!
//! let header = vec![
//!     Token::new(Signal::BeginComposite, "messageHeader").with_size(8),
//!     Token::encoding("blockLength", PrimitiveType::UInt16),
//!     Token::encoding("templateId", PrimitiveType::UInt16).with_offset(2),
//!     Token::encoding("schemaId", PrimitiveType::UInt16).with_offset(4),
//!     Token::encoding("version", PrimitiveType::UInt16).with_offset(6),
//!     Token::new(Signal::EndComposite, "messageHeader"),
//! ];
//! let quote = vec![
//!     Token::new(Signal::BeginMessage, "Quote").with_id(1).with_size(8),
//!     Token::new(Signal::BeginField, "price"),
//!     Token::encoding("price", PrimitiveType::Int64),
//!     Token::new(Signal::EndField, "price"),
//!     Token::new(Signal::EndMessage, "Quote").with_id(1),
//! ];
//! let mut ir = IntermediateRepresentation::new("md", 0, header)?;
//! ir.add_message(1, quote)?;
//!
//! // Encode a message
//! let tokens = ir.message(1)?;
//! let encoder = MessageEncoder::new(tokens)?;
//! let mut buffer = ByteView::growable(64);
//! let body = HeaderEncoder::new(ir.header_structure())?.encode(
//!     &mut buffer,
//!     0,
//!     &MessageHeader { block_length: 8, template_id: 1, schema_id: 7, version: 0 },
//! )?;
//! encoder.put_field(&mut buffer, body, "price", &PrimitiveValue::Int(12_500))?;
//!
//! // Decode it back
//! struct Prices(Vec<i64>);
//! impl TokenListener for Prices {
//!     fn on_encoding(
//!         &mut self,
//!         _field: &Token,
//!         buffer: &ByteView<'_>,
//!         index: usize,
//!         token: &Token,
//!         version: i32,
//!     ) -> sbe_otf::Result<()> {
//!         let value = sbe_otf::otf::value::resolve_value(buffer, index, token, version)?;
//!         self.0.extend(value.as_i64());
//!         Ok(())
//!     }
//! }
//!
//! let headers = HeaderDecoder::new(ir.header_structure())?;
//! let message = headers.decode(&buffer, 0)?;
//! let mut prices = Prices(Vec::new());
//! MessageDecoder::decode(
//!     &buffer,
//!     headers.size(),
//!     message.version as i32,
//!     message.block_length as usize,
//!     ir.message(message.template_id)?,
//!     &mut prices,
//! )?;
//! assert_eq!(prices.0, [12_500]);
//! # Ok::<(), sbe_otf::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod buffer;
pub mod error;
pub mod ir;
pub mod otf;
pub mod primitive;

// Re-export main types
pub use buffer::ByteView;
pub use error::{Error, Result};
pub use ir::{IntermediateRepresentation, Token};
pub use otf::{MessageDecoder, TokenListener};
pub use primitive::{PrimitiveType, PrimitiveValue};
