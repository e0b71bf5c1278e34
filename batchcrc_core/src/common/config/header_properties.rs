//! Header Properties
//! Headers can be described in `.properties` files, one `key=value` per field, for example:
//! ```text
//! base.offset=42
//! record.count=3
//! ```
//! Fields that are not provided stay at zero.

use crate::common::record::record_batch_header::{RecordBatchField, RecordBatchHeader};
use crate::rpc::header::RpcHeader;
use enum_iterator::IntoEnumIterator;
use fs_err::File;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufReader};
use std::num;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

// Record batch header keys
pub const SIZE_BYTES_PROP: &str = "size.bytes";
pub const BASE_OFFSET_PROP: &str = "base.offset";
pub const RECORD_BATCH_TYPE_PROP: &str = "record.batch.type";
pub const CRC_PROP: &str = "crc";
pub const ATTRIBUTES_PROP: &str = "attributes";
pub const LAST_OFFSET_DELTA_PROP: &str = "last.offset.delta";
pub const FIRST_TIMESTAMP_PROP: &str = "first.timestamp";
pub const MAX_TIMESTAMP_PROP: &str = "max.timestamp";
pub const PRODUCER_ID_PROP: &str = "producer.id";
pub const PRODUCER_EPOCH_PROP: &str = "producer.epoch";
pub const BASE_SEQUENCE_PROP: &str = "base.sequence";
pub const RECORD_COUNT_PROP: &str = "record.count";

// RPC header keys
pub const VERSION_PROP: &str = "version";
pub const HEADER_CHECKSUM_PROP: &str = "header.checksum";
pub const COMPRESSION_PROP: &str = "compression";
pub const PAYLOAD_SIZE_PROP: &str = "payload.size";
pub const META_PROP: &str = "meta";
pub const CORRELATION_ID_PROP: &str = "correlation.id";
pub const PAYLOAD_CHECKSUM_PROP: &str = "payload.checksum";

/// `HeaderPropertiesError` is returned when properties are invalid, unknown or the file is not
/// readable.
#[derive(Error, Debug)]
pub enum HeaderPropertiesError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Property error: {0}")]
    Property(#[from] java_properties::PropertiesError),
    #[error("ParseInt error: {0}")]
    ParseInt(#[from] num::ParseIntError),
    #[error("Unknown Key: {0}")]
    UnknownKey(String),
    #[error("Invalid Value: {0}")]
    InvalidValue(String),
}

/// This implementation is only for testing, for example any I/O error is considered equal
impl PartialEq for HeaderPropertiesError {
    fn eq(&self, rhs: &Self) -> bool {
        match self {
            Self::Io(_) => matches!(rhs, Self::Io(_)),
            Self::Property(lhs) => {
                matches!(rhs, Self::Property(rhs) if lhs.line_number() == rhs.line_number())
            },
            Self::ParseInt(lhs) => matches!(rhs, Self::ParseInt(rhs) if lhs == rhs),
            Self::UnknownKey(lhs) => matches!(rhs, Self::UnknownKey(rhs) if lhs == rhs),
            Self::InvalidValue(lhs) => matches!(rhs, Self::InvalidValue(rhs) if lhs == rhs),
        }
    }
}

impl fmt::Display for RecordBatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeBytes => write!(f, "{}", SIZE_BYTES_PROP),
            Self::BaseOffset => write!(f, "{}", BASE_OFFSET_PROP),
            Self::RecordBatchType => write!(f, "{}", RECORD_BATCH_TYPE_PROP),
            Self::Crc => write!(f, "{}", CRC_PROP),
            Self::Attributes => write!(f, "{}", ATTRIBUTES_PROP),
            Self::LastOffsetDelta => write!(f, "{}", LAST_OFFSET_DELTA_PROP),
            Self::FirstTimestamp => write!(f, "{}", FIRST_TIMESTAMP_PROP),
            Self::MaxTimestamp => write!(f, "{}", MAX_TIMESTAMP_PROP),
            Self::ProducerId => write!(f, "{}", PRODUCER_ID_PROP),
            Self::ProducerEpoch => write!(f, "{}", PRODUCER_EPOCH_PROP),
            Self::BaseSequence => write!(f, "{}", BASE_SEQUENCE_PROP),
            Self::RecordCount => write!(f, "{}", RECORD_COUNT_PROP),
        }
    }
}

impl FromStr for RecordBatchField {
    type Err = HeaderPropertiesError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            SIZE_BYTES_PROP => Ok(Self::SizeBytes),
            BASE_OFFSET_PROP => Ok(Self::BaseOffset),
            RECORD_BATCH_TYPE_PROP => Ok(Self::RecordBatchType),
            CRC_PROP => Ok(Self::Crc),
            ATTRIBUTES_PROP => Ok(Self::Attributes),
            LAST_OFFSET_DELTA_PROP => Ok(Self::LastOffsetDelta),
            FIRST_TIMESTAMP_PROP => Ok(Self::FirstTimestamp),
            MAX_TIMESTAMP_PROP => Ok(Self::MaxTimestamp),
            PRODUCER_ID_PROP => Ok(Self::ProducerId),
            PRODUCER_EPOCH_PROP => Ok(Self::ProducerEpoch),
            BASE_SEQUENCE_PROP => Ok(Self::BaseSequence),
            RECORD_COUNT_PROP => Ok(Self::RecordCount),
            _ => Err(HeaderPropertiesError::UnknownKey(input.to_string())),
        }
    }
}

/// A set of functions the header property sets implement: setting values by key, loading them
/// from a file and building the final header.
pub trait HeaderPropertySet {
    type Header;

    /// `try_set_property` parses a string value from the properties into the header field
    fn try_set_property(
        &mut self,
        property_name: &str,
        property_value: &str,
    ) -> Result<(), HeaderPropertiesError>;

    /// `build` validates the collected values and returns the header
    fn build(&self) -> Result<Self::Header, HeaderPropertiesError>;

    /// `config_names` returns the list of keys understood by this set
    fn config_names() -> Vec<String>;

    /// Transforms from a HashMap of properties into a property set.
    /// This may return HeaderPropertiesError::UnknownKey errors
    fn from_properties_hashmap(
        input_config: HashMap<String, String>,
    ) -> Result<Self, HeaderPropertiesError>
    where
        Self: Default,
    {
        let mut config_builder = Self::default();
        for (property, property_value) in &input_config {
            debug!("from_properties_hashmap: {} = {}", property, property_value);
            config_builder.try_set_property(property, property_value)?;
        }
        Ok(config_builder)
    }

    /// `read_config_file` reads a `.properties` file
    fn read_config_file(filename: &str) -> Result<Self, HeaderPropertiesError>
    where
        Self: Default,
    {
        debug!("read_config_file: Reading {}", filename);
        let mut config_file_content = File::open(filename)?;
        let input_config = java_properties::read(BufReader::new(&mut config_file_content))?;
        Self::from_properties_hashmap(input_config)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordBatchHeaderProperties {
    header: RecordBatchHeader,
}

impl HeaderPropertySet for RecordBatchHeaderProperties {
    type Header = RecordBatchHeader;

    fn try_set_property(
        &mut self,
        property_name: &str,
        property_value: &str,
    ) -> Result<(), HeaderPropertiesError> {
        let field = RecordBatchField::from_str(property_name)?;
        let value = property_value.trim();
        let header = &mut self.header;
        match field {
            RecordBatchField::SizeBytes => header.size_bytes = value.parse()?,
            RecordBatchField::BaseOffset => header.base_offset = value.parse()?,
            RecordBatchField::RecordBatchType => header.record_batch_type = value.parse()?,
            RecordBatchField::Crc => header.crc = value.parse()?,
            RecordBatchField::Attributes => header.attributes = value.parse()?,
            RecordBatchField::LastOffsetDelta => header.last_offset_delta = value.parse()?,
            RecordBatchField::FirstTimestamp => header.first_timestamp = value.parse()?,
            RecordBatchField::MaxTimestamp => header.max_timestamp = value.parse()?,
            RecordBatchField::ProducerId => header.producer_id = value.parse()?,
            RecordBatchField::ProducerEpoch => header.producer_epoch = value.parse()?,
            RecordBatchField::BaseSequence => header.base_sequence = value.parse()?,
            RecordBatchField::RecordCount => header.record_count = value.parse()?,
        };
        Ok(())
    }

    /// The header checksum is computed with `crc` set to zero, a header that arrives with it
    /// already filled in is refused instead of silently being checksummed.
    fn build(&self) -> Result<RecordBatchHeader, HeaderPropertiesError> {
        trace!("RecordBatchHeaderProperties::build()");
        if self.header.crc != 0 {
            return Err(HeaderPropertiesError::InvalidValue(format!(
                "{}: '{}' must be 0 before the header checksum is computed",
                CRC_PROP, self.header.crc
            )));
        }
        Ok(self.header)
    }

    fn config_names() -> Vec<String> {
        RecordBatchField::into_enum_iter().map(|val| val.to_string()).collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcHeaderProperties {
    header: RpcHeader,
}

impl HeaderPropertySet for RpcHeaderProperties {
    type Header = RpcHeader;

    fn try_set_property(
        &mut self,
        property_name: &str,
        property_value: &str,
    ) -> Result<(), HeaderPropertiesError> {
        let value = property_value.trim();
        let header = &mut self.header;
        match property_name {
            VERSION_PROP => header.version = value.parse()?,
            HEADER_CHECKSUM_PROP => header.header_checksum = value.parse()?,
            COMPRESSION_PROP => header.compression = value.parse()?,
            PAYLOAD_SIZE_PROP => header.payload_size = value.parse()?,
            META_PROP => header.meta = value.parse()?,
            CORRELATION_ID_PROP => header.correlation_id = value.parse()?,
            PAYLOAD_CHECKSUM_PROP => header.payload_checksum = value.parse()?,
            _ => return Err(HeaderPropertiesError::UnknownKey(property_name.to_string())),
        };
        Ok(())
    }

    fn build(&self) -> Result<RpcHeader, HeaderPropertiesError> {
        trace!("RpcHeaderProperties::build()");
        Ok(self.header)
    }

    fn config_names() -> Vec<String> {
        [
            VERSION_PROP,
            HEADER_CHECKSUM_PROP,
            COMPRESSION_PROP,
            PAYLOAD_SIZE_PROP,
            META_PROP,
            CORRELATION_ID_PROP,
            PAYLOAD_CHECKSUM_PROP,
        ]
        .iter()
        .map(|val| val.to_string())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn it_gets_record_batch_header_from_hashmap() {
        let empty_config: HashMap<String, String> = HashMap::new();
        let header = RecordBatchHeaderProperties::from_properties_hashmap(empty_config)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(header, RecordBatchHeader::default());

        let mut unknown_key_config: HashMap<String, String> = HashMap::new();
        unknown_key_config.insert(String::from("not.a.known.key"), String::from("1"));
        assert_eq!(
            RecordBatchHeaderProperties::from_properties_hashmap(unknown_key_config).unwrap_err(),
            HeaderPropertiesError::UnknownKey(String::from("not.a.known.key"))
        );

        let mut full_config: HashMap<String, String> = HashMap::new();
        full_config.insert(String::from(BASE_OFFSET_PROP), String::from("42"));
        full_config.insert(String::from(RECORD_BATCH_TYPE_PROP), String::from("-1"));
        full_config.insert(String::from(ATTRIBUTES_PROP), String::from(" 65535 "));
        full_config.insert(String::from(PRODUCER_ID_PROP), String::from("-1"));
        full_config.insert(String::from(RECORD_COUNT_PROP), String::from("4294967295"));
        let header = RecordBatchHeaderProperties::from_properties_hashmap(full_config)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(header.base_offset, 42);
        assert_eq!(header.record_batch_type, -1);
        assert_eq!(header.attributes, u16::MAX);
        assert_eq!(header.producer_id, -1);
        assert_eq!(header.record_count, u32::MAX);
    }

    #[test_log::test]
    fn it_refuses_out_of_range_values() {
        let mut props = RecordBatchHeaderProperties::default();
        assert!(matches!(
            props.try_set_property(RECORD_BATCH_TYPE_PROP, "128"),
            Err(HeaderPropertiesError::ParseInt(_))
        ));
        assert!(matches!(
            props.try_set_property(ATTRIBUTES_PROP, "-1"),
            Err(HeaderPropertiesError::ParseInt(_))
        ));
    }

    #[test_log::test]
    fn it_refuses_a_prefilled_crc() {
        let mut props = RecordBatchHeaderProperties::default();
        props.try_set_property(CRC_PROP, "17").unwrap();
        assert_eq!(
            props.build().unwrap_err(),
            HeaderPropertiesError::InvalidValue(format!(
                "{}: '17' must be 0 before the header checksum is computed",
                CRC_PROP
            ))
        );
        props.try_set_property(CRC_PROP, "0").unwrap();
        assert!(props.build().is_ok());
    }

    #[test_log::test]
    fn it_lists_every_field_key() {
        let names = RecordBatchHeaderProperties::config_names();
        assert_eq!(names.len(), 12);
        for name in &names {
            let field = RecordBatchField::from_str(name).unwrap();
            assert_eq!(&field.to_string(), name);
        }
        assert_eq!(RpcHeaderProperties::config_names().len(), 7);
    }

    #[test_log::test]
    fn it_gets_rpc_header_from_hashmap() {
        let mut config: HashMap<String, String> = HashMap::new();
        config.insert(String::from(VERSION_PROP), String::from("1"));
        config.insert(String::from(CORRELATION_ID_PROP), String::from("99"));
        config.insert(String::from(PAYLOAD_CHECKSUM_PROP), String::from("18446744073709551615"));
        let header =
            RpcHeaderProperties::from_properties_hashmap(config).unwrap().build().unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.correlation_id, 99);
        assert_eq!(header.payload_checksum, u64::MAX);
        let mut props = RpcHeaderProperties::default();
        assert_eq!(
            props.try_set_property("payload_size", "1").unwrap_err(),
            HeaderPropertiesError::UnknownKey(String::from("payload_size"))
        );
    }

    #[test_log::test]
    fn it_fails_on_missing_files() {
        let res = RecordBatchHeaderProperties::read_config_file("/nonexistent/batch.properties");
        assert_eq!(
            res.unwrap_err(),
            HeaderPropertiesError::Io(io::Error::from(io::ErrorKind::NotFound))
        );
    }
}
