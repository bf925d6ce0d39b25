pub mod s3_store;
