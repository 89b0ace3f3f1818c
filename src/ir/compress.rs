//! LZ4 envelope around the bootstrap IR bytes
//!
//! The envelope is the bootstrap encoding compressed as one LZ4 block with
//! its uncompressed size prepended as a little-endian `u32`.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::ir::codec::{IrDecoder, IrEncoder};
use crate::ir::repr::IntermediateRepresentation;

/// Encode an IR and compress the result
pub fn encode_compressed(ir: &IntermediateRepresentation) -> Result<Vec<u8>> {
    let raw = IrEncoder::encode(ir)?;
    let compressed = lz4_flex::compress_prepend_size(&raw);
    log::debug!("compressed IR from {} to {} bytes", raw.len(), compressed.len());
    Ok(compressed)
}

/// Inflate an envelope and decode the IR inside
pub fn decode_compressed(bytes: &[u8]) -> Result<IntermediateRepresentation> {
    let raw = lz4_flex::decompress_size_prepended(bytes).map_err(|_| Error::Decompress)?;
    IrDecoder::decode(&raw)
}
