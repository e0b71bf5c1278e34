//! Record batch header, internal checksum form.
//! The header checksum is computed over a fixed 57 byte little-endian serialization of the
//! header fields, laid out back to back in declaration order. The `crc` field sits inside the
//! bytes being checksummed, callers must leave it at zero while the checksum is computed and
//! store the result afterwards (see [`RecordBatchHeader::seal`]).

use crate::common::crc::Crc32c;
use crate::utils::byte_order::{write_fixed, Endianness};
use bytes::{Buf, BufMut};
use enum_iterator::IntoEnumIterator;
use thiserror::Error;
use tracing::trace;

/// The current offset and size for all the fixed-length fields
pub const SIZE_BYTES_OFFSET: usize = 0;
pub const SIZE_BYTES_LENGTH: usize = 4;
pub const BASE_OFFSET_OFFSET: usize = SIZE_BYTES_OFFSET + SIZE_BYTES_LENGTH;
pub const BASE_OFFSET_LENGTH: usize = 8;
pub const RECORD_BATCH_TYPE_OFFSET: usize = BASE_OFFSET_OFFSET + BASE_OFFSET_LENGTH;
pub const RECORD_BATCH_TYPE_LENGTH: usize = 1;
pub const CRC_OFFSET: usize = RECORD_BATCH_TYPE_OFFSET + RECORD_BATCH_TYPE_LENGTH;
pub const CRC_LENGTH: usize = 4;
pub const ATTRIBUTES_OFFSET: usize = CRC_OFFSET + CRC_LENGTH;
pub const ATTRIBUTES_LENGTH: usize = 2;
pub const LAST_OFFSET_DELTA_OFFSET: usize = ATTRIBUTES_OFFSET + ATTRIBUTES_LENGTH;
pub const LAST_OFFSET_DELTA_LENGTH: usize = 4;
pub const FIRST_TIMESTAMP_OFFSET: usize = LAST_OFFSET_DELTA_OFFSET + LAST_OFFSET_DELTA_LENGTH;
pub const FIRST_TIMESTAMP_LENGTH: usize = 8;
pub const MAX_TIMESTAMP_OFFSET: usize = FIRST_TIMESTAMP_OFFSET + FIRST_TIMESTAMP_LENGTH;
pub const MAX_TIMESTAMP_LENGTH: usize = 8;
pub const PRODUCER_ID_OFFSET: usize = MAX_TIMESTAMP_OFFSET + MAX_TIMESTAMP_LENGTH;
pub const PRODUCER_ID_LENGTH: usize = 8;
pub const PRODUCER_EPOCH_OFFSET: usize = PRODUCER_ID_OFFSET + PRODUCER_ID_LENGTH;
pub const PRODUCER_EPOCH_LENGTH: usize = 2;
pub const BASE_SEQUENCE_OFFSET: usize = PRODUCER_EPOCH_OFFSET + PRODUCER_EPOCH_LENGTH;
pub const BASE_SEQUENCE_LENGTH: usize = 4;
pub const RECORD_COUNT_OFFSET: usize = BASE_SEQUENCE_OFFSET + BASE_SEQUENCE_LENGTH;
pub const RECORD_COUNT_LENGTH: usize = 4;
/// The size of the serialized header the checksum covers
pub const RECORD_BATCH_HEADER_SIZE: usize = RECORD_COUNT_OFFSET + RECORD_COUNT_LENGTH;

const _: () = assert!(RECORD_BATCH_HEADER_SIZE == 57);

const BYTE_ORDER: Endianness = Endianness::Little;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordBatchHeaderError {
    #[error("The crc field must be zero while the header checksum is computed, found {0:}")]
    NonZeroCrc(i32),
    #[error("Truncated record batch header: expected 57 bytes, found {0:}")]
    Truncated(usize),
}

/// The fields of the record batch header in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoEnumIterator)]
pub enum RecordBatchField {
    SizeBytes,
    BaseOffset,
    RecordBatchType,
    Crc,
    Attributes,
    LastOffsetDelta,
    FirstTimestamp,
    MaxTimestamp,
    ProducerId,
    ProducerEpoch,
    BaseSequence,
    RecordCount,
}

impl RecordBatchField {
    pub const fn offset(self) -> usize {
        match self {
            Self::SizeBytes => SIZE_BYTES_OFFSET,
            Self::BaseOffset => BASE_OFFSET_OFFSET,
            Self::RecordBatchType => RECORD_BATCH_TYPE_OFFSET,
            Self::Crc => CRC_OFFSET,
            Self::Attributes => ATTRIBUTES_OFFSET,
            Self::LastOffsetDelta => LAST_OFFSET_DELTA_OFFSET,
            Self::FirstTimestamp => FIRST_TIMESTAMP_OFFSET,
            Self::MaxTimestamp => MAX_TIMESTAMP_OFFSET,
            Self::ProducerId => PRODUCER_ID_OFFSET,
            Self::ProducerEpoch => PRODUCER_EPOCH_OFFSET,
            Self::BaseSequence => BASE_SEQUENCE_OFFSET,
            Self::RecordCount => RECORD_COUNT_OFFSET,
        }
    }

    pub const fn width(self) -> usize {
        match self {
            Self::SizeBytes => SIZE_BYTES_LENGTH,
            Self::BaseOffset => BASE_OFFSET_LENGTH,
            Self::RecordBatchType => RECORD_BATCH_TYPE_LENGTH,
            Self::Crc => CRC_LENGTH,
            Self::Attributes => ATTRIBUTES_LENGTH,
            Self::LastOffsetDelta => LAST_OFFSET_DELTA_LENGTH,
            Self::FirstTimestamp => FIRST_TIMESTAMP_LENGTH,
            Self::MaxTimestamp => MAX_TIMESTAMP_LENGTH,
            Self::ProducerId => PRODUCER_ID_LENGTH,
            Self::ProducerEpoch => PRODUCER_EPOCH_LENGTH,
            Self::BaseSequence => BASE_SEQUENCE_LENGTH,
            Self::RecordCount => RECORD_COUNT_LENGTH,
        }
    }

    /// Only `attributes` and `record_count` are unsigned
    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::Attributes | Self::RecordCount)
    }
}

/// Header of a batch of records, as handed over by the producer of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RecordBatchHeader {
    pub size_bytes: i32,
    pub base_offset: i64,
    pub record_batch_type: i8,
    /// Must be zero while the checksum is being computed
    pub crc: i32,
    pub attributes: u16,
    pub last_offset_delta: i32,
    pub first_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub record_count: u32,
}

impl RecordBatchHeader {
    /// `encode_internal` serializes every field, `crc` included as-is, into the layout the
    /// header checksum is computed over.
    pub fn encode_internal(&self) -> [u8; RECORD_BATCH_HEADER_SIZE] {
        let mut buf = [0u8; RECORD_BATCH_HEADER_SIZE];
        write_fixed(&mut buf, SIZE_BYTES_OFFSET, self.size_bytes, BYTE_ORDER);
        write_fixed(&mut buf, BASE_OFFSET_OFFSET, self.base_offset, BYTE_ORDER);
        write_fixed(&mut buf, RECORD_BATCH_TYPE_OFFSET, self.record_batch_type, BYTE_ORDER);
        write_fixed(&mut buf, CRC_OFFSET, self.crc, BYTE_ORDER);
        write_fixed(&mut buf, ATTRIBUTES_OFFSET, self.attributes, BYTE_ORDER);
        write_fixed(&mut buf, LAST_OFFSET_DELTA_OFFSET, self.last_offset_delta, BYTE_ORDER);
        write_fixed(&mut buf, FIRST_TIMESTAMP_OFFSET, self.first_timestamp, BYTE_ORDER);
        write_fixed(&mut buf, MAX_TIMESTAMP_OFFSET, self.max_timestamp, BYTE_ORDER);
        write_fixed(&mut buf, PRODUCER_ID_OFFSET, self.producer_id, BYTE_ORDER);
        write_fixed(&mut buf, PRODUCER_EPOCH_OFFSET, self.producer_epoch, BYTE_ORDER);
        write_fixed(&mut buf, BASE_SEQUENCE_OFFSET, self.base_sequence, BYTE_ORDER);
        write_fixed(&mut buf, RECORD_COUNT_OFFSET, self.record_count, BYTE_ORDER);
        buf
    }

    /// Appends the internal serialization to `dst`.
    pub fn encode_into<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&self.encode_internal());
    }

    /// Parses the internal serialization. The checksum is not verified.
    pub fn decode<B: Buf>(src: &mut B) -> Result<Self, RecordBatchHeaderError> {
        if src.remaining() < RECORD_BATCH_HEADER_SIZE {
            return Err(RecordBatchHeaderError::Truncated(src.remaining()));
        }
        Ok(Self {
            size_bytes: src.get_i32_le(),
            base_offset: src.get_i64_le(),
            record_batch_type: src.get_i8(),
            crc: src.get_i32_le(),
            attributes: src.get_u16_le(),
            last_offset_delta: src.get_i32_le(),
            first_timestamp: src.get_i64_le(),
            max_timestamp: src.get_i64_le(),
            producer_id: src.get_i64_le(),
            producer_epoch: src.get_i16_le(),
            base_sequence: src.get_i32_le(),
            record_count: src.get_u32_le(),
        })
    }

    /// Same as [`crc_record_batch_header_internal`], but refuses headers whose `crc` field has
    /// already been filled in.
    pub fn checked_crc(&self) -> Result<u32, RecordBatchHeaderError> {
        if self.crc != 0 {
            return Err(RecordBatchHeaderError::NonZeroCrc(self.crc));
        }
        Ok(crc_record_batch_header_internal(self))
    }

    /// Returns a copy of the header carrying its own checksum in `crc`. Whatever `crc` held
    /// before is ignored.
    #[must_use]
    pub fn seal(self) -> Self {
        let crc = crc_record_batch_header_internal(&Self { crc: 0, ..self });
        trace!("RecordBatchHeader::seal() base_offset {} crc {:#010x}", self.base_offset, crc);
        // The wire field is signed, keep the bit pattern
        Self { crc: crc as i32, ..self }
    }
}

/// `crc_record_batch_header_internal` computes the CRC32C (seed 0) of the 57 byte internal
/// serialization of `header`. The `crc` field is serialized from whatever the caller set, by
/// convention zero.
pub fn crc_record_batch_header_internal(header: &RecordBatchHeader) -> u32 {
    Crc32c::new().extend(&header.encode_internal()).value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::crc::crc32c;
    use crate::utils::byte_order::read_fixed;
    use bytes::BytesMut;

    fn sample_header() -> RecordBatchHeader {
        RecordBatchHeader {
            size_bytes: 1_024,
            base_offset: 4_200,
            record_batch_type: 1,
            crc: 0,
            attributes: 0x0010,
            last_offset_delta: 9,
            first_timestamp: 1_600_000_000_000,
            max_timestamp: 1_600_000_000_900,
            producer_id: 77,
            producer_epoch: 3,
            base_sequence: 120,
            record_count: 10,
        }
    }

    #[test_log::test]
    fn it_lays_fields_back_to_back() {
        let mut expected_offset = 0;
        for field in RecordBatchField::into_enum_iter() {
            assert_eq!(field.offset(), expected_offset, "{:?}", field);
            expected_offset += field.width();
        }
        assert_eq!(expected_offset, RECORD_BATCH_HEADER_SIZE);
        assert_eq!(RecordBatchField::into_enum_iter().count(), 12);
        assert_eq!(RecordBatchField::ProducerEpoch.offset(), 47);
        assert_eq!(RecordBatchField::RecordCount.offset(), 53);
        let unsigned: Vec<RecordBatchField> =
            RecordBatchField::into_enum_iter().filter(|field| !field.is_signed()).collect();
        assert_eq!(unsigned, vec![RecordBatchField::Attributes, RecordBatchField::RecordCount]);
    }

    #[test_log::test]
    fn it_checksums_an_empty_header_as_zero_bytes() {
        let header = RecordBatchHeader::default();
        assert_eq!(header.encode_internal(), [0u8; RECORD_BATCH_HEADER_SIZE]);
        assert_eq!(crc_record_batch_header_internal(&header), crc32c(&[0u8; 57], 0));
    }

    #[test_log::test]
    fn it_writes_fields_little_endian() {
        let header = RecordBatchHeader {
            size_bytes: 0x0102_0304,
            attributes: 0xbeef,
            record_batch_type: -1,
            ..Default::default()
        };
        let buf = header.encode_internal();
        assert_eq!(buf[..4], [0x04u8, 0x03, 0x02, 0x01]);
        assert_eq!(buf[RECORD_BATCH_TYPE_OFFSET], 0xff);
        assert_eq!(buf[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + 2], [0xefu8, 0xbe]);
        assert_eq!(read_fixed::<u16>(&buf, ATTRIBUTES_OFFSET, Endianness::Little), 0xbeef);
    }

    #[test_log::test]
    fn it_serializes_crc_as_given() {
        let header = sample_header();
        let with_crc = RecordBatchHeader { crc: 5, ..header };
        assert_ne!(
            crc_record_batch_header_internal(&header),
            crc_record_batch_header_internal(&with_crc)
        );
        assert_eq!(with_crc.checked_crc(), Err(RecordBatchHeaderError::NonZeroCrc(5)));
        assert_eq!(header.checked_crc(), Ok(crc_record_batch_header_internal(&header)));
    }

    #[test_log::test]
    fn it_seals_regardless_of_previous_crc() {
        let header = sample_header();
        let sealed = header.seal();
        assert_eq!(sealed.crc as u32, crc_record_batch_header_internal(&header));
        assert_eq!(RecordBatchHeader { crc: 0, ..sealed }, header);
        // Sealing twice yields the same checksum
        assert_eq!(sealed.seal(), sealed);
    }

    #[test_log::test]
    fn it_decodes_its_own_encoding() {
        let header = sample_header().seal();
        let mut buf = BytesMut::with_capacity(RECORD_BATCH_HEADER_SIZE + 3);
        header.encode_into(&mut buf);
        buf.put_slice(b"xyz");
        let mut src = buf.freeze();
        assert_eq!(RecordBatchHeader::decode(&mut src), Ok(header));
        assert_eq!(&src[..], b"xyz");
        assert_eq!(
            RecordBatchHeader::decode(&mut &[0u8; 56][..]),
            Err(RecordBatchHeaderError::Truncated(56))
        );
    }
}
