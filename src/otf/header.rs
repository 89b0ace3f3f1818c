//! Schema-driven message header access
//!
//! The header layout comes from the header composite of the IR, so offsets,
//! widths and byte order of the header fields are whatever the schema says.

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::{ByteOrder, HeaderStructure, Token};
use crate::otf::value::get_int;
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Root block length of the message
    pub block_length: i64,
    /// Template id selecting the message
    pub template_id: i64,
    /// Id of the schema
    pub schema_id: i64,
    /// Schema version the message was encoded with
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldLayout {
    offset: usize,
    ty: PrimitiveType,
    order: ByteOrder,
}

impl FieldLayout {
    fn capture(token: &Token) -> Result<Self> {
        Ok(Self {
            offset: token.block_offset(),
            ty: token.primitive_type()?,
            order: token.encoding.byte_order,
        })
    }

    #[inline]
    fn read(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<i64> {
        get_int(buffer, buffer_offset + self.offset, self.ty, self.order)
    }

    #[inline]
    fn write(&self, buffer: &mut ByteView<'_>, buffer_offset: usize, value: i64) -> Result<()> {
        buffer.put_primitive(buffer_offset + self.offset, &PrimitiveValue::Int(value), self.ty, self.order)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderLayout {
    size: usize,
    block_length: FieldLayout,
    template_id: FieldLayout,
    schema_id: FieldLayout,
    schema_version: FieldLayout,
}

impl HeaderLayout {
    fn capture(structure: &HeaderStructure) -> Result<Self> {
        let schema_id = structure
            .schema_id()
            .ok_or(Error::MissingHeaderField(HeaderStructure::SCHEMA_ID))?;

        let layout = Self {
            size: structure.size(),
            block_length: FieldLayout::capture(structure.block_length())?,
            template_id: FieldLayout::capture(structure.template_id())?,
            schema_id: FieldLayout::capture(schema_id)?,
            schema_version: FieldLayout::capture(structure.schema_version())?,
        };
        log::debug!(
            "captured header layout size={} blockLength@{} templateId@{} schemaId@{} version@{}",
            layout.size,
            layout.block_length.offset,
            layout.template_id.offset,
            layout.schema_id.offset,
            layout.schema_version.offset
        );
        Ok(layout)
    }
}

/// Reads header fields from encoded messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDecoder {
    layout: HeaderLayout,
}

impl HeaderDecoder {
    /// Capture the layout of `blockLength`, `templateId`, `schemaId` and
    /// `version`; all four must be present
    pub fn new(structure: &HeaderStructure) -> Result<Self> {
        Ok(Self {
            layout: HeaderLayout::capture(structure)?,
        })
    }

    /// Encoded size of the header
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size
    }

    /// Root block length of the message at `buffer_offset`
    #[inline]
    pub fn block_length(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<i64> {
        self.layout.block_length.read(buffer, buffer_offset)
    }

    /// Template id of the message at `buffer_offset`
    #[inline]
    pub fn template_id(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<i64> {
        self.layout.template_id.read(buffer, buffer_offset)
    }

    /// Schema id of the message at `buffer_offset`
    #[inline]
    pub fn schema_id(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<i64> {
        self.layout.schema_id.read(buffer, buffer_offset)
    }

    /// Schema version of the message at `buffer_offset`
    #[inline]
    pub fn schema_version(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<i64> {
        self.layout.schema_version.read(buffer, buffer_offset)
    }

    /// All four fields at once
    pub fn decode(&self, buffer: &ByteView<'_>, buffer_offset: usize) -> Result<MessageHeader> {
        Ok(MessageHeader {
            block_length: self.block_length(buffer, buffer_offset)?,
            template_id: self.template_id(buffer, buffer_offset)?,
            schema_id: self.schema_id(buffer, buffer_offset)?,
            version: self.schema_version(buffer, buffer_offset)?,
        })
    }
}

/// Writes message headers through the schema's header layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEncoder {
    layout: HeaderLayout,
}

impl HeaderEncoder {
    /// Capture the header layout; all four fields must be present
    pub fn new(structure: &HeaderStructure) -> Result<Self> {
        Ok(Self {
            layout: HeaderLayout::capture(structure)?,
        })
    }

    /// Encoded size of the header
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size
    }

    /// Write `header` at `buffer_offset`, growing the buffer if it allows.
    ///
    /// Returns the offset just past the header.
    pub fn encode(&self, buffer: &mut ByteView<'_>, buffer_offset: usize, header: &MessageHeader) -> Result<usize> {
        let end = buffer_offset.checked_add(self.layout.size).ok_or(Error::Overflow)?;
        buffer.check_limit(end)?;

        self.layout.block_length.write(buffer, buffer_offset, header.block_length)?;
        self.layout.template_id.write(buffer, buffer_offset, header.template_id)?;
        self.layout.schema_id.write(buffer, buffer_offset, header.schema_id)?;
        self.layout.schema_version.write(buffer, buffer_offset, header.version)?;
        Ok(end)
    }
}
