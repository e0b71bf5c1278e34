//! CRC32C (Castagnoli) checksums.
//! The polynomial arithmetic comes from the `crc32c` crate, this module only deals with seeding
//! and with feeding variable length fields into a running checksum.

use crate::utils::vint::{encode_varint, zigzag_encode, MAX_VARINT_LEN};

/// `crc32c` extends `seed`, a previously finalized checksum (0 for a fresh one), with `bytes`.
/// Feeding contiguous pieces one after the other gives the same result as the whole.
#[inline]
pub fn crc32c(bytes: &[u8], seed: u32) -> u32 {
    ::crc32c::crc32c_append(seed, bytes)
}

/// `crc_extend_vint` extends `crc` with the zigzag varint encoding of `value`, using a stack
/// scratch buffer instead of materializing the encoded field.
pub fn crc_extend_vint(value: i64, crc: u32) -> u32 {
    let mut scratch = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(zigzag_encode(value), &mut scratch);
    crc32c(&scratch[..len], crc)
}

/// A running checksum. It is plain data: every extension consumes the current value and returns
/// the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Crc32c(u32);

impl Crc32c {
    pub fn new() -> Self {
        Self(0)
    }

    /// Resumes from a checksum computed elsewhere.
    pub fn with_seed(seed: u32) -> Self {
        Self(seed)
    }

    #[must_use]
    pub fn extend(self, bytes: &[u8]) -> Self {
        Self(crc32c(bytes, self.0))
    }

    #[must_use]
    pub fn extend_vint(self, value: i64) -> Self {
        Self(crc_extend_vint(value, self.0))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<Crc32c> for u32 {
    fn from(crc: Crc32c) -> u32 {
        crc.value()
    }
}
