//! Callbacks emitted while walking a message against a buffer
//!
//! Every method has an empty default so that a listener only implements what
//! it needs. Returning an error aborts the decode and propagates to the caller.

use crate::buffer::ByteView;
use crate::error::Result;
use crate::ir::Token;

/// Receiver of structural decode events
#[allow(unused_variables)]
pub trait TokenListener {
    /// A message starts
    fn on_begin_message(&mut self, token: &Token) -> Result<()> {
        Ok(())
    }

    /// A message ends
    fn on_end_message(&mut self, token: &Token) -> Result<()> {
        Ok(())
    }

    /// A primitive value located at `buffer_index`.
    ///
    /// `field_token` names the value; `type_token` describes its encoding.
    /// Inside composites both are the member's own encoding token.
    fn on_encoding(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        type_token: &Token,
        acting_version: i32,
    ) -> Result<()> {
        Ok(())
    }

    /// An enum value located at `buffer_index`; `tokens` spans
    /// `BeginEnum` ... `EndEnum`
    fn on_enum(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> Result<()> {
        Ok(())
    }

    /// A bit set located at `buffer_index`; `tokens` spans
    /// `BeginSet` ... `EndSet`
    fn on_bit_set(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> Result<()> {
        Ok(())
    }

    /// A composite starts; `tokens` spans `BeginComposite` ... `EndComposite`
    fn on_begin_composite(&mut self, field_token: &Token, tokens: &[Token]) -> Result<()> {
        Ok(())
    }

    /// A composite ends
    fn on_end_composite(&mut self, field_token: &Token, tokens: &[Token]) -> Result<()> {
        Ok(())
    }

    /// A group's dimension header has been read, before any iteration
    fn on_group_header(&mut self, token: &Token, num_in_group: usize) -> Result<()> {
        Ok(())
    }

    /// Iteration `group_index` of `num_in_group` starts
    fn on_begin_group(&mut self, token: &Token, group_index: usize, num_in_group: usize) -> Result<()> {
        Ok(())
    }

    /// Iteration `group_index` of `num_in_group` ends
    fn on_end_group(&mut self, token: &Token, group_index: usize, num_in_group: usize) -> Result<()> {
        Ok(())
    }

    /// Variable length data of `length` bytes starting at `buffer_index`
    fn on_var_data(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        length: usize,
        type_token: &Token,
    ) -> Result<()> {
        Ok(())
    }
}
