//! S3-compatible object storage for uploaded course images.

mod minio_client;

pub use minio_client::MinIOClient;
