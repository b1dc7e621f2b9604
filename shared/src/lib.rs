pub mod log;
pub mod s3;
pub mod store;
