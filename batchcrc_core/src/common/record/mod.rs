pub mod record_batch_header;
