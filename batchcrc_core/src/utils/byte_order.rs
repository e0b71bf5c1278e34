//! Fixed-width integer fields at explicit offsets.
//! Wire headers are assembled by writing every field into its own disjoint range of a byte
//! buffer, with the width, signedness and byte order dictated by the protocol. Signedness is
//! carried by the Rust type being written (i32 vs u32, etc).

use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ByteOrderError {
    #[error("Buffer too small: {width:} byte field at offset {offset:} does not fit in {len:} bytes")]
    BufferTooSmall { offset: usize, width: usize, len: usize },
}

/// The byte order a multi-byte field is laid out in.
/// Single byte fields are identical under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little-endian"),
            Self::Big => write!(f, "big-endian"),
        }
    }
}

/// An integer with a fixed on-wire width of 1, 2, 4 or 8 bytes.
pub trait FixedWidth: Copy + Sized {
    /// Number of bytes this type occupies on the wire
    const WIDTH: usize;

    /// Writes `self` into `dst`, which must be exactly `WIDTH` bytes long.
    fn put(self, dst: &mut [u8], endianness: Endianness);

    /// Reads a value from `src`, which must be exactly `WIDTH` bytes long.
    fn get(src: &[u8], endianness: Endianness) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put(self, dst: &mut [u8], endianness: Endianness) {
                    let bytes = match endianness {
                        Endianness::Little => self.to_le_bytes(),
                        Endianness::Big => self.to_be_bytes(),
                    };
                    dst.copy_from_slice(&bytes);
                }

                #[inline]
                fn get(src: &[u8], endianness: Endianness) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(src);
                    match endianness {
                        Endianness::Little => <$ty>::from_le_bytes(bytes),
                        Endianness::Big => <$ty>::from_be_bytes(bytes),
                    }
                }
            }
        )*
    };
}

impl_fixed_width!(i8, u8, i16, u16, i32, u32, i64, u64);

fn field_range(len: usize, offset: usize, width: usize) -> Result<Range<usize>, ByteOrderError> {
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(ByteOrderError::BufferTooSmall { offset, width, len }),
    }
}

/// `try_write_fixed` writes exactly `T::WIDTH` bytes of `value` into
/// `buf[offset..offset + T::WIDTH]`. Nothing is written if the range does not fit.
pub fn try_write_fixed<T: FixedWidth>(
    buf: &mut [u8],
    offset: usize,
    value: T,
    endianness: Endianness,
) -> Result<(), ByteOrderError> {
    let range = field_range(buf.len(), offset, T::WIDTH)?;
    value.put(&mut buf[range], endianness);
    Ok(())
}

/// `write_fixed` is the unchecked flavour of [`try_write_fixed`], meant for buffers whose size
/// and field offsets are compile-time constants.
///
/// # Panics
///
/// If `buf.len() < offset + T::WIDTH`.
pub fn write_fixed<T: FixedWidth>(buf: &mut [u8], offset: usize, value: T, endianness: Endianness) {
    if let Err(err) = try_write_fixed(buf, offset, value, endianness) {
        panic!("write_fixed: {}", err);
    }
}

/// `try_read_fixed` reads a `T` back from `buf[offset..offset + T::WIDTH]`.
pub fn try_read_fixed<T: FixedWidth>(
    buf: &[u8],
    offset: usize,
    endianness: Endianness,
) -> Result<T, ByteOrderError> {
    let range = field_range(buf.len(), offset, T::WIDTH)?;
    Ok(T::get(&buf[range], endianness))
}

/// # Panics
///
/// If `buf.len() < offset + T::WIDTH`.
pub fn read_fixed<T: FixedWidth>(buf: &[u8], offset: usize, endianness: Endianness) -> T {
    match try_read_fixed(buf, offset, endianness) {
        Ok(val) => val,
        Err(err) => panic!("read_fixed: {}", err),
    }
}
