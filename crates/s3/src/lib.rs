//! bs-s3: S3 backend for bs-core
//!
//! Implements the `StorageBackend` trait from bs-core on top of aws-sdk-s3.
//! This is the only crate that depends on the AWS SDK.

pub mod client;
mod error;
mod upload;

pub use client::S3Backend;
pub use upload::PART_SIZE;
