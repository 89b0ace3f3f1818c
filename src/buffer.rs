//! Zero-copy byte view with endian-aware primitive accessors
//!
//! A [`ByteView`] wraps either borrowed bytes (read-only or mutable) or an owned
//! `Vec<u8>`. Every accessor is offset-checked against the current capacity and
//! reports [`Error::BufferOverflow`] rather than panicking. Writes past the end
//! are only possible after [`ByteView::check_limit`] has grown the region
//! through an installed overflow handler.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};
use crate::ir::ByteOrder;
use crate::primitive::{PrimitiveType, PrimitiveValue};

/// Growth hook invoked as `(current_capacity, requested_limit)`.
///
/// Returns a larger backing region, or `None` to refuse. The view copies its
/// existing bytes to the front of the returned region.
pub type OverflowHandler<'a> = Box<dyn FnMut(usize, usize) -> Option<Vec<u8>> + Send + Sync + 'a>;

enum Region<'a> {
    Shared(&'a [u8]),
    Borrowed(&'a mut [u8]),
    Owned(Vec<u8>),
}

/// Readable/writable window over a byte region
pub struct ByteView<'a> {
    region: Region<'a>,
    overflow: Option<OverflowHandler<'a>>,
}

macro_rules! primitive_accessors {
    ($ty:ty, $n:literal, $get:ident, $get_le:ident, $get_be:ident, $put:ident, $put_le:ident, $put_be:ident) => {
        #[doc = concat!("Read a little-endian `", stringify!($ty), "`")]
        #[inline]
        pub fn $get_le(&self, index: usize) -> Result<$ty> {
            Ok(<$ty>::from_le_bytes(self.read_array::<$n>(index)?))
        }

        #[doc = concat!("Read a big-endian `", stringify!($ty), "`")]
        #[inline]
        pub fn $get_be(&self, index: usize) -> Result<$ty> {
            Ok(<$ty>::from_be_bytes(self.read_array::<$n>(index)?))
        }

        #[doc = concat!("Read a `", stringify!($ty), "` in the given byte order")]
        #[inline]
        pub fn $get(&self, index: usize, order: ByteOrder) -> Result<$ty> {
            match order {
                ByteOrder::LittleEndian => self.$get_le(index),
                ByteOrder::BigEndian => self.$get_be(index),
            }
        }

        #[doc = concat!("Write a little-endian `", stringify!($ty), "`")]
        #[inline]
        pub fn $put_le(&mut self, index: usize, value: $ty) -> Result<()> {
            self.write_array(index, value.to_le_bytes())
        }

        #[doc = concat!("Write a big-endian `", stringify!($ty), "`")]
        #[inline]
        pub fn $put_be(&mut self, index: usize, value: $ty) -> Result<()> {
            self.write_array(index, value.to_be_bytes())
        }

        #[doc = concat!("Write a `", stringify!($ty), "` in the given byte order")]
        #[inline]
        pub fn $put(&mut self, index: usize, value: $ty, order: ByteOrder) -> Result<()> {
            match order {
                ByteOrder::LittleEndian => self.$put_le(index, value),
                ByteOrder::BigEndian => self.$put_be(index, value),
            }
        }
    };
}

impl<'a> ByteView<'a> {
    /// Read-only view over borrowed bytes
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            region: Region::Shared(bytes),
            overflow: None,
        }
    }

    /// Writable view over borrowed bytes
    #[inline]
    pub fn new_mut(bytes: &'a mut [u8]) -> Self {
        Self {
            region: Region::Borrowed(bytes),
            overflow: None,
        }
    }

    /// Install a growth hook consulted by [`check_limit`](Self::check_limit)
    pub fn with_overflow_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(usize, usize) -> Option<Vec<u8>> + Send + Sync + 'a,
    {
        self.overflow = Some(Box::new(handler));
        self
    }

    /// Current capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.as_slice().len()
    }

    /// True when the view cannot be written to
    #[inline]
    pub fn is_read_only(&self) -> bool {
        matches!(self.region, Region::Shared(_))
    }

    /// The whole backing region
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.region {
            Region::Shared(bytes) => bytes,
            Region::Borrowed(bytes) => bytes,
            Region::Owned(bytes) => bytes,
        }
    }

    /// Copy out (or take) the backing region
    pub fn into_vec(self) -> Vec<u8> {
        match self.region {
            Region::Owned(bytes) => bytes,
            Region::Shared(bytes) => bytes.to_vec(),
            Region::Borrowed(bytes) => bytes.to_vec(),
        }
    }

    /// Fail unless `position` addresses a byte inside the region
    #[inline]
    pub fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.capacity() {
            return Err(Error::BufferOverflow {
                limit: position,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Ensure the region spans at least `limit` bytes.
    ///
    /// Without an overflow handler this fails with [`Error::BufferOverflow`].
    /// With one, the handler is asked for a larger region, existing bytes are
    /// copied to its front and the check repeats. A handler that refuses or
    /// returns a region no larger than the current one fails the check.
    pub fn check_limit(&mut self, limit: usize) -> Result<()> {
        while limit > self.capacity() {
            let capacity = self.capacity();
            let overflow = Error::BufferOverflow { limit, capacity };

            let handler = self.overflow.as_mut().ok_or_else(|| overflow.clone())?;
            let mut grown = match handler(capacity, limit) {
                Some(grown) if grown.len() > capacity => grown,
                _ => {
                    log::warn!(
                        "overflow handler refused growth: capacity={} limit={}",
                        capacity,
                        limit
                    );
                    return Err(overflow);
                }
            };

            grown[..capacity].copy_from_slice(self.as_slice());
            log::trace!("byte view grown from {} to {} bytes", capacity, grown.len());
            self.region = Region::Owned(grown);
        }
        Ok(())
    }

    #[inline]
    fn range(&self, index: usize, len: usize) -> Result<core::ops::Range<usize>> {
        let capacity = self.capacity();
        match index.checked_add(len) {
            Some(end) if end <= capacity => Ok(index..end),
            Some(end) => Err(Error::BufferOverflow {
                limit: end,
                capacity,
            }),
            None => Err(Error::BufferOverflow {
                limit: usize::MAX,
                capacity,
            }),
        }
    }

    #[inline]
    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.region {
            Region::Shared(_) => Err(Error::ReadOnlyBuffer),
            Region::Borrowed(bytes) => Ok(bytes),
            Region::Owned(bytes) => Ok(bytes.as_mut_slice()),
        }
    }

    #[inline]
    fn read_array<const N: usize>(&self, index: usize) -> Result<[u8; N]> {
        let range = self.range(index, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.as_slice()[range]);
        Ok(out)
    }

    #[inline]
    fn write_array<const N: usize>(&mut self, index: usize, bytes: [u8; N]) -> Result<()> {
        let range = self.range(index, N)?;
        self.bytes_mut()?[range].copy_from_slice(&bytes);
        Ok(())
    }

    /// Read a single character byte
    #[inline]
    pub fn get_char(&self, index: usize) -> Result<u8> {
        self.get_u8(index)
    }

    /// Write a single character byte
    #[inline]
    pub fn put_char(&mut self, index: usize, value: u8) -> Result<()> {
        self.put_u8(index, value)
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&self, index: usize) -> Result<u8> {
        Ok(self.read_array::<1>(index)?[0])
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, index: usize, value: u8) -> Result<()> {
        self.write_array(index, [value])
    }

    /// Read an i8 value
    #[inline]
    pub fn get_i8(&self, index: usize) -> Result<i8> {
        Ok(self.get_u8(index)? as i8)
    }

    /// Write an i8 value
    #[inline]
    pub fn put_i8(&mut self, index: usize, value: i8) -> Result<()> {
        self.put_u8(index, value as u8)
    }

    primitive_accessors!(u16, 2, get_u16, get_u16_le, get_u16_be, put_u16, put_u16_le, put_u16_be);
    primitive_accessors!(i16, 2, get_i16, get_i16_le, get_i16_be, put_i16, put_i16_le, put_i16_be);
    primitive_accessors!(u32, 4, get_u32, get_u32_le, get_u32_be, put_u32, put_u32_le, put_u32_be);
    primitive_accessors!(i32, 4, get_i32, get_i32_le, get_i32_be, put_i32, put_i32_le, put_i32_be);
    primitive_accessors!(u64, 8, get_u64, get_u64_le, get_u64_be, put_u64, put_u64_le, put_u64_be);
    primitive_accessors!(i64, 8, get_i64, get_i64_le, get_i64_be, put_i64, put_i64_le, put_i64_be);
    primitive_accessors!(f32, 4, get_f32, get_f32_le, get_f32_be, put_f32, put_f32_le, put_f32_be);
    primitive_accessors!(f64, 8, get_f64, get_f64_le, get_f64_be, put_f64, put_f64_le, put_f64_be);

    /// Zero-copy slice of `len` bytes starting at `index`
    #[inline]
    pub fn slice(&self, index: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(index, len)?;
        Ok(&self.as_slice()[range])
    }

    /// Copy `dst.len()` bytes starting at `index` into `dst`
    #[inline]
    pub fn get_bytes(&self, index: usize, dst: &mut [u8]) -> Result<usize> {
        dst.copy_from_slice(self.slice(index, dst.len())?);
        Ok(dst.len())
    }

    /// Copy `src` into the region starting at `index`
    #[inline]
    pub fn put_bytes(&mut self, index: usize, src: &[u8]) -> Result<usize> {
        let range = self.range(index, src.len())?;
        self.bytes_mut()?[range].copy_from_slice(src);
        Ok(src.len())
    }

    /// Read one element of `ty` as a typed value
    pub fn get_primitive(
        &self,
        index: usize,
        ty: PrimitiveType,
        order: ByteOrder,
    ) -> Result<PrimitiveValue> {
        Ok(match ty {
            PrimitiveType::Char => PrimitiveValue::Char(self.get_char(index)?),
            PrimitiveType::Int8 => PrimitiveValue::Int(self.get_i8(index)? as i64),
            PrimitiveType::Int16 => PrimitiveValue::Int(self.get_i16(index, order)? as i64),
            PrimitiveType::Int32 => PrimitiveValue::Int(self.get_i32(index, order)? as i64),
            PrimitiveType::Int64 => PrimitiveValue::Int(self.get_i64(index, order)?),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(self.get_u8(index)? as u64),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(self.get_u16(index, order)? as u64),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(self.get_u32(index, order)? as u64),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(self.get_u64(index, order)?),
            PrimitiveType::Float => PrimitiveValue::Float(self.get_f32(index, order)? as f64),
            PrimitiveType::Double => PrimitiveValue::Float(self.get_f64(index, order)?),
        })
    }

    /// Store `value` as `ty` at `index`, returning the bytes written.
    ///
    /// Integers that do not fit the target width fail with
    /// [`Error::IncompatibleValue`] and leave the buffer untouched. A `Bytes`
    /// value is only accepted for `char` and is copied verbatim.
    pub fn put_primitive(
        &mut self,
        index: usize,
        value: &PrimitiveValue,
        ty: PrimitiveType,
        order: ByteOrder,
    ) -> Result<usize> {
        let incompatible = || Error::IncompatibleValue(ty);
        match (ty, value) {
            (PrimitiveType::Char, PrimitiveValue::Bytes(bytes)) => return self.put_bytes(index, bytes),
            (_, PrimitiveValue::Bytes(_)) => return Err(incompatible()),
            (PrimitiveType::Float, v) => {
                self.put_f32(index, v.as_f64().ok_or_else(incompatible)? as f32, order)?
            }
            (PrimitiveType::Double, v) => self.put_f64(index, v.as_f64().ok_or_else(incompatible)?, order)?,
            (_, PrimitiveValue::Float(_)) => return Err(incompatible()),
            (ty, v) if ty.is_signed() => {
                let raw = v.as_i64().ok_or_else(incompatible)?;
                match ty {
                    PrimitiveType::Int8 => self.put_i8(index, i8::try_from(raw).map_err(|_| incompatible())?)?,
                    PrimitiveType::Int16 => {
                        self.put_i16(index, i16::try_from(raw).map_err(|_| incompatible())?, order)?
                    }
                    PrimitiveType::Int32 => {
                        self.put_i32(index, i32::try_from(raw).map_err(|_| incompatible())?, order)?
                    }
                    _ => self.put_i64(index, raw, order)?,
                }
            }
            (ty, v) => {
                let raw = v.as_u64().ok_or_else(incompatible)?;
                match ty {
                    PrimitiveType::Char => self.put_char(index, u8::try_from(raw).map_err(|_| incompatible())?)?,
                    PrimitiveType::UInt8 => self.put_u8(index, u8::try_from(raw).map_err(|_| incompatible())?)?,
                    PrimitiveType::UInt16 => {
                        self.put_u16(index, u16::try_from(raw).map_err(|_| incompatible())?, order)?
                    }
                    PrimitiveType::UInt32 => {
                        self.put_u32(index, u32::try_from(raw).map_err(|_| incompatible())?, order)?
                    }
                    _ => self.put_u64(index, raw, order)?,
                }
            }
        }
        Ok(ty.size())
    }
}

impl ByteView<'static> {
    /// Writable view over an owned region
    #[inline]
    pub fn owned(bytes: Vec<u8>) -> Self {
        Self {
            region: Region::Owned(bytes),
            overflow: None,
        }
    }

    /// Zero-filled owned region of `capacity` bytes
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::owned(vec![0u8; capacity])
    }

    /// Owned region that doubles its capacity whenever a limit check overflows
    pub fn growable(capacity: usize) -> Self {
        Self::with_capacity(capacity).with_overflow_handler(|capacity, limit| {
            let mut next = capacity.max(1);
            while next < limit {
                next = next.checked_mul(2)?;
            }
            Some(vec![0u8; next])
        })
    }
}

impl fmt::Debug for ByteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("capacity", &self.capacity())
            .field("read_only", &self.is_read_only())
            .field("growable", &self.overflow.is_some())
            .finish()
    }
}
