//! Checksums for the fixed headers of the broker wire protocol.
//! - `utils::byte_order`: fixed-width fields at explicit offsets, either byte order.
//! - `utils::vint`: zigzag variable length integers.
//! - `common::crc`: CRC32C seeding and streaming extension over vints.
//! - `common::record` and `rpc`: the record batch header and RPC header checksums.
#![warn(rust_2018_idioms)]

pub mod common;
pub mod rpc;
pub mod utils;

pub use common::crc::{crc32c, crc_extend_vint, Crc32c};
pub use common::record::record_batch_header::{
    crc_record_batch_header_internal, RecordBatchField, RecordBatchHeader,
};
pub use rpc::header::{rpc_header_crc32, RpcHeader};
