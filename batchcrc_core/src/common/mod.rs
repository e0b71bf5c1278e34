pub mod config;
pub mod crc;
pub mod record;
