//! Bit set values
//!
//! A set field is an unsigned integer of 1, 2, 4 or 8 bytes whose bits are
//! named by the `Choice` tokens of its type. Each choice carries its bit index
//! as its value.

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::{ByteOrder, Token};
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Bits of one set value together with its encoded width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceSet {
    bits: u64,
    encoding: PrimitiveType,
}

impl ChoiceSet {
    /// Empty set stored as `encoding`
    #[inline]
    pub const fn new(encoding: PrimitiveType) -> Self {
        Self { bits: 0, encoding }
    }

    /// Set with the given raw bits
    #[inline]
    pub const fn from_bits(bits: u64, encoding: PrimitiveType) -> Self {
        Self { bits, encoding }
    }

    /// Raw bits
    #[inline]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Primitive the set is stored as
    #[inline]
    pub const fn encoding(&self) -> PrimitiveType {
        self.encoding
    }

    /// Number of addressable bits
    #[inline]
    pub const fn width(&self) -> usize {
        self.encoding.size() * 8
    }

    /// Set a bit
    #[inline]
    pub fn set(&mut self, bit: usize) -> Result<()> {
        if bit >= self.width() {
            return Err(Error::Overflow);
        }
        self.bits |= 1 << bit;
        Ok(())
    }

    /// Clear a bit
    #[inline]
    pub fn clear(&mut self, bit: usize) -> Result<()> {
        if bit >= self.width() {
            return Err(Error::Overflow);
        }
        self.bits &= !(1 << bit);
        Ok(())
    }

    /// Check a bit
    #[inline]
    pub fn is_set(&self, bit: usize) -> bool {
        bit < self.width() && (self.bits >> bit) & 1 != 0
    }

    /// Check the bit a `Choice` token names
    pub fn is_chosen(&self, choice: &Token) -> bool {
        choice_bit(choice).map_or(false, |bit| self.is_set(bit))
    }

    /// Set the bit a `Choice` token names
    pub fn choose(&mut self, choice: &Token) -> Result<()> {
        let bit = choice_bit(choice).ok_or(Error::IncompatibleValue(self.encoding))?;
        self.set(bit)
    }

    /// Number of set bits
    #[inline]
    pub fn count_set(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// True when no bit is set
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Indices of set bits
    #[inline]
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.width()).filter(move |&bit| self.is_set(bit))
    }

    /// Write the set at `index`, returning the bytes written
    pub fn encode(&self, buffer: &mut ByteView<'_>, index: usize, order: ByteOrder) -> Result<usize> {
        buffer.put_primitive(index, &PrimitiveValue::UInt(self.bits), self.encoding, order)
    }

    /// Read a set stored as `encoding` at `index`
    pub fn decode(
        buffer: &ByteView<'_>,
        index: usize,
        encoding: PrimitiveType,
        order: ByteOrder,
    ) -> Result<Self> {
        let raw = buffer.get_primitive(index, encoding, order)?;
        let bits = match raw {
            PrimitiveValue::Int(v) => v as u64,
            other => other.as_u64().ok_or(Error::IncompatibleValue(encoding))?,
        };
        Ok(Self::from_bits(bits, encoding))
    }
}

fn choice_bit(choice: &Token) -> Option<usize> {
    choice
        .encoding
        .const_value
        .as_ref()
        .and_then(PrimitiveValue::as_u64)
        .and_then(|bit| usize::try_from(bit).ok())
}
