//! On-the-fly decoding and encoding of messages driven by IR token lists

pub mod bitset;
pub mod decoder;
pub mod encoder;
pub mod header;
#[cfg(feature = "json")]
pub mod json;
pub mod listener;
pub mod value;

pub use bitset::ChoiceSet;
pub use decoder::MessageDecoder;
pub use encoder::MessageEncoder;
pub use header::{HeaderDecoder, HeaderEncoder, MessageHeader};
#[cfg(feature = "json")]
pub use json::JsonTokenListener;
pub use listener::TokenListener;
