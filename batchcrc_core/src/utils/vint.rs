//! Zigzag variable length integers.
//! Signed values are first zigzag mapped (0, -1, 1, -2, 2 -> 0, 1, 2, 3, 4) and then written
//! 7 bits at a time, least significant group first, with the high bit of every byte but the
//! last flagging that more bytes follow.

use std::iter::FusedIterator;

/// Upper bound on the encoded size of a 64-bit value: ceil(64 / 7)
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;
const VALUE_MASK: u64 = 0x7f;

/// Maps a signed value to an unsigned one so that small magnitudes stay small.
/// The right shift is arithmetic, `n >> 63` is either all zeros or all ones.
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Number of bytes `value` takes once varint encoded, never less than one.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        (bits + 6) / 7
    }
}

/// Lazily yields the varint encoding of a value, one byte at a time.
#[derive(Debug, Clone)]
pub struct VarintBytes {
    remaining: u64,
    done: bool,
}

impl VarintBytes {
    pub fn new(value: u64) -> Self {
        Self { remaining: value, done: false }
    }
}

impl Iterator for VarintBytes {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        if self.remaining > VALUE_MASK {
            let byte = (self.remaining & VALUE_MASK) as u8 | CONTINUATION_BIT;
            self.remaining >>= 7;
            Some(byte)
        } else {
            self.done = true;
            Some(self.remaining as u8)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = if self.done { 0 } else { encoded_len(self.remaining) };
        (len, Some(len))
    }
}

impl ExactSizeIterator for VarintBytes {}

impl FusedIterator for VarintBytes {}

pub fn varint_bytes(value: u64) -> VarintBytes {
    VarintBytes::new(value)
}

/// `encode_varint` writes the encoding of `value` to the front of `dst` and returns how many
/// bytes were used.
pub fn encode_varint(value: u64, dst: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    for (slot, byte) in dst.iter_mut().zip(varint_bytes(value)) {
        *slot = byte;
        len += 1;
    }
    len
}

/// `decode_varint` returns the decoded value and the number of bytes consumed, or `None` if
/// `src` ends before the final byte or the encoding runs past `MAX_VARINT_LEN` bytes.
pub fn decode_varint(src: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (idx, &byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= (u64::from(byte) & VALUE_MASK) << (7 * idx);
        if byte & CONTINUATION_BIT == 0 {
            return Some((value, idx + 1));
        }
    }
    None
}
