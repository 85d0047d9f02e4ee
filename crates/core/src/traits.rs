//! StorageBackend trait definition
//!
//! This trait is the only seam between the blob abstraction and a concrete
//! object store. Backends return raw shapes (heads, summaries, listings);
//! the core turns them into [`BlobResourceInfo`](crate::BlobResourceInfo)
//! descriptors and pages.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stream::ByteStream;

/// User metadata attached to a blob
pub type Metadata = BTreeMap<String, String>;

/// Mime type reported when a backend has none on record
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Which backend family produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process [`MemoryBackend`](crate::MemoryBackend)
    Memory,
    /// S3-compatible object store
    S3,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("memory"),
            BackendKind::S3 => f.write_str("s3"),
        }
    }
}

/// Result of a head-style lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: u64,
    pub mime_type: String,
    pub last_modified: Timestamp,
    pub user_metadata: Metadata,
}

/// One entry of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Timestamp,
}

/// Continuation state of a listing, tagged by the backend that issued it
///
/// Only the issuing backend knows how to interpret the payload. Handing a
/// cursor to another backend kind is a contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCursor {
    Memory {
        repository: String,
        prefix: Option<String>,
        start_after: String,
    },
    S3 {
        bucket: String,
        prefix: Option<String>,
        continuation_token: String,
    },
}

impl ListCursor {
    /// Backend family that issued this cursor
    pub fn backend(&self) -> BackendKind {
        match self {
            ListCursor::Memory { .. } => BackendKind::Memory,
            ListCursor::S3 { .. } => BackendKind::S3,
        }
    }

    /// Repository the listing runs over
    pub fn repository(&self) -> &str {
        match self {
            ListCursor::Memory { repository, .. } => repository,
            ListCursor::S3 { bucket, .. } => bucket,
        }
    }

    /// Prefix the listing was started with
    pub fn prefix(&self) -> Option<&str> {
        match self {
            ListCursor::Memory { prefix, .. } | ListCursor::S3 { prefix, .. } => prefix.as_deref(),
        }
    }
}

/// A page of object summaries as returned by a backend
#[derive(Debug, Clone)]
pub struct ObjectListing {
    pub repository: String,
    pub summaries: Vec<ObjectSummary>,
    /// Present when `truncated` is true
    pub cursor: Option<ListCursor>,
    pub truncated: bool,
}

/// Inclusive byte range `[start, start + length - 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Last byte included in the range
    ///
    /// Callers must not build empty ranges; see [`ByteRange::is_empty`].
    pub fn end_inclusive(&self) -> u64 {
        self.start + self.length.saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// HTTP `Range` header value
    pub fn to_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive())
    }
}

/// Access control requested for a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectAcl {
    #[default]
    Private,
    PublicRead,
}

/// Everything a backend needs to store one object
pub struct PutObjectRequest {
    pub repository: String,
    pub key: String,
    pub body: ByteStream,
    pub content_length: u64,
    pub mime_type: String,
    pub metadata: Metadata,
    pub acl: ObjectAcl,
    /// Backend storage class name, `None` for the backend default
    pub storage_class: Option<String>,
}

impl fmt::Debug for PutObjectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutObjectRequest")
            .field("repository", &self.repository)
            .field("key", &self.key)
            .field("content_length", &self.content_length)
            .field("mime_type", &self.mime_type)
            .field("metadata", &self.metadata)
            .field("acl", &self.acl)
            .field("storage_class", &self.storage_class)
            .finish_non_exhaustive()
    }
}

/// Capabilities a blob backend must provide
///
/// Implemented by the S3 adapter and the in-memory backend, and mocked in
/// tests. Not-found conditions are reported as
/// [`Error::NotFound`](crate::Error::NotFound) on every method; the core
/// decides where they are absorbed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend family, used to validate cursors
    fn kind(&self) -> BackendKind;

    /// Size, type, modification time and user metadata of one object
    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectHead>;

    /// Open a stream over the object, or over `range` of it
    async fn get_object(
        &self,
        repository: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ByteStream>;

    /// Store an object, replacing any existing one
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;

    /// Remove an object
    async fn delete_object(&self, repository: &str, key: &str) -> Result<()>;

    /// First page of objects whose key starts with `prefix`; empty lists all
    async fn list_objects(&self, repository: &str, prefix: &str) -> Result<ObjectListing>;

    /// Page following the one that produced `cursor`
    async fn list_objects_next(&self, cursor: &ListCursor) -> Result<ObjectListing>;

    /// Check if a bucket exists
    async fn bucket_exists(&self, repository: &str) -> Result<bool>;

    /// Create a bucket, optionally pinned to a location
    async fn create_bucket(&self, repository: &str, location: Option<String>) -> Result<()>;

    /// Delete a bucket
    async fn delete_bucket(&self, repository: &str) -> Result<()>;
}
