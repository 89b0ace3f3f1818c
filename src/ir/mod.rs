//! Intermediate representation of a schema: tokens, the IR aggregate, its
//! structural validation and the bootstrap wire codec

pub mod codec;
#[cfg(feature = "lz4")]
pub mod compress;
pub mod repr;
pub mod token;
pub mod validate;

pub use codec::{IrDecoder, IrEncoder, IrFrame, IR_VERSION};
#[cfg(feature = "lz4")]
pub use compress::{decode_compressed, encode_compressed};
pub use repr::{HeaderStructure, IntermediateRepresentation};
pub use token::{ByteOrder, Encoding, Presence, Signal, Token};
pub use validate::{find_matching_end, validate, validate_message};
