//! RPC envelope header.
//! A 26 byte little-endian prefix of every RPC frame:
//! - (1 byte) version
//! - (4 bytes) header checksum, computed over the bytes that follow it
//! - (1 byte) compression
//! - (4 bytes) payload size
//! - (4 bytes) meta
//! - (4 bytes) correlation id
//! - (8 bytes) payload checksum

use crate::common::crc::Crc32c;
use crate::utils::byte_order::{write_fixed, Endianness};
use bytes::{Buf, BufMut};
use thiserror::Error;
use tracing::trace;

pub const VERSION_OFFSET: usize = 0;
pub const HEADER_CHECKSUM_OFFSET: usize = 1;
pub const COMPRESSION_OFFSET: usize = 5;
pub const PAYLOAD_SIZE_OFFSET: usize = 6;
pub const META_OFFSET: usize = 10;
pub const CORRELATION_ID_OFFSET: usize = 14;
pub const PAYLOAD_CHECKSUM_OFFSET: usize = 18;
pub const RPC_HEADER_SIZE: usize = 26;

/// The byte ranges the header checksum covers, one per field after the checksum itself.
/// Version and header checksum (bytes 0 to 4) are left out.
const CHECKSUM_RANGES: [(usize, usize); 5] = [
    (COMPRESSION_OFFSET, PAYLOAD_SIZE_OFFSET),
    (PAYLOAD_SIZE_OFFSET, META_OFFSET),
    (META_OFFSET, CORRELATION_ID_OFFSET),
    (CORRELATION_ID_OFFSET, PAYLOAD_CHECKSUM_OFFSET),
    (PAYLOAD_CHECKSUM_OFFSET, RPC_HEADER_SIZE),
];

const BYTE_ORDER: Endianness = Endianness::Little;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RpcHeaderError {
    #[error("RPC header too short: expected at least 26 bytes, found {0:}")]
    TooShort(usize),
}

/// `rpc_header_crc32` computes the header checksum of the RPC header at the start of `header`.
/// Bytes past the first 26 are not looked at.
pub fn rpc_header_crc32(header: &[u8]) -> Result<u32, RpcHeaderError> {
    if header.len() < RPC_HEADER_SIZE {
        return Err(RpcHeaderError::TooShort(header.len()));
    }
    Ok(CHECKSUM_RANGES
        .iter()
        .fold(Crc32c::new(), |crc, &(begin, end)| crc.extend(&header[begin..end]))
        .value())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RpcHeader {
    pub version: u8,
    pub header_checksum: u32,
    pub compression: u8,
    pub payload_size: u32,
    pub meta: u32,
    pub correlation_id: u32,
    pub payload_checksum: u64,
}

impl RpcHeader {
    pub fn encode(&self) -> [u8; RPC_HEADER_SIZE] {
        let mut buf = [0u8; RPC_HEADER_SIZE];
        write_fixed(&mut buf, VERSION_OFFSET, self.version, BYTE_ORDER);
        write_fixed(&mut buf, HEADER_CHECKSUM_OFFSET, self.header_checksum, BYTE_ORDER);
        write_fixed(&mut buf, COMPRESSION_OFFSET, self.compression, BYTE_ORDER);
        write_fixed(&mut buf, PAYLOAD_SIZE_OFFSET, self.payload_size, BYTE_ORDER);
        write_fixed(&mut buf, META_OFFSET, self.meta, BYTE_ORDER);
        write_fixed(&mut buf, CORRELATION_ID_OFFSET, self.correlation_id, BYTE_ORDER);
        write_fixed(&mut buf, PAYLOAD_CHECKSUM_OFFSET, self.payload_checksum, BYTE_ORDER);
        buf
    }

    pub fn encode_into<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&self.encode());
    }

    /// Parses a header without verifying `header_checksum`.
    pub fn decode<B: Buf>(src: &mut B) -> Result<Self, RpcHeaderError> {
        if src.remaining() < RPC_HEADER_SIZE {
            return Err(RpcHeaderError::TooShort(src.remaining()));
        }
        Ok(Self {
            version: src.get_u8(),
            header_checksum: src.get_u32_le(),
            compression: src.get_u8(),
            payload_size: src.get_u32_le(),
            meta: src.get_u32_le(),
            correlation_id: src.get_u32_le(),
            payload_checksum: src.get_u64_le(),
        })
    }

    /// The checksum this header should carry in `header_checksum`.
    pub fn header_crc32(&self) -> u32 {
        let buf = self.encode();
        CHECKSUM_RANGES
            .iter()
            .fold(Crc32c::new(), |crc, &(begin, end)| crc.extend(&buf[begin..end]))
            .value()
    }

    #[must_use]
    pub fn seal(self) -> Self {
        let header_checksum = self.header_crc32();
        trace!(
            "RpcHeader::seal() correlation_id {} checksum {:#010x}",
            self.correlation_id,
            header_checksum
        );
        Self { header_checksum, ..self }
    }
}
