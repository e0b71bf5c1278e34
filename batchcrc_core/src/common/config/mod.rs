pub mod header_properties;
