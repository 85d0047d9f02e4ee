//! Blob descriptors
//!
//! A [`BlobResourceInfo`] describes one blob. Size and modification time are
//! known when the descriptor is built; the mime type and user metadata of a
//! descriptor built from a listing are fetched on first use, exactly once,
//! and cached for the lifetime of the instance.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use jiff::Timestamp;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::{Error, Result};
use crate::key::BlobKey;
use crate::stream::{ByteStream, bytes_stream, slice_range};
use crate::traits::{ByteRange, Metadata, ObjectHead, ObjectSummary, StorageBackend};

/// Lazily resolved part of a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attributes {
    mime_type: String,
    metadata: Metadata,
}

enum Content {
    /// Streamed from the backend on every request
    Backend(Arc<dyn StorageBackend>),
    /// Local buffer, re-readable and sliceable
    Buffer(Bytes),
    /// Local one-shot stream, taken by the first reader
    Stream(Mutex<Option<ByteStream>>),
}

/// Descriptor of one blob with lazily resolved metadata
pub struct BlobResourceInfo {
    key: BlobKey,
    content_length: u64,
    last_modified: Timestamp,
    attributes: OnceCell<Attributes>,
    /// Entries added before `attributes` was resolved; layered over the fetch
    pending: Metadata,
    content: Content,
}

impl BlobResourceInfo {
    /// Descriptor for a listing entry; type and metadata stay unresolved
    pub(crate) fn from_summary(
        repository: &str,
        summary: ObjectSummary,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            key: BlobKey::new(repository, summary.key),
            content_length: summary.size,
            last_modified: summary.last_modified,
            attributes: OnceCell::new(),
            pending: Metadata::new(),
            content: Content::Backend(backend),
        }
    }

    /// Descriptor for a head lookup; nothing left to resolve
    pub(crate) fn from_head(
        key: BlobKey,
        head: ObjectHead,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            key,
            content_length: head.size,
            last_modified: head.last_modified,
            attributes: OnceCell::from(Attributes {
                mime_type: head.mime_type,
                metadata: head.user_metadata,
            }),
            pending: Metadata::new(),
            content: Content::Backend(backend),
        }
    }

    /// Descriptor for in-memory content about to be stored
    pub fn from_bytes(key: BlobKey, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self::local(key, mime_type.into(), data.len() as u64, Content::Buffer(data))
    }

    /// Descriptor for streamed content about to be stored
    ///
    /// The stream can be read once; `content_length` must match the number of
    /// bytes it yields.
    pub fn from_stream(
        key: BlobKey,
        mime_type: impl Into<String>,
        stream: ByteStream,
        content_length: u64,
    ) -> Self {
        Self::local(
            key,
            mime_type.into(),
            content_length,
            Content::Stream(Mutex::new(Some(stream))),
        )
    }

    fn local(key: BlobKey, mime_type: String, content_length: u64, content: Content) -> Self {
        Self {
            key,
            content_length,
            last_modified: Timestamp::now(),
            attributes: OnceCell::from(Attributes {
                mime_type,
                metadata: Metadata::new(),
            }),
            pending: Metadata::new(),
            content,
        }
    }

    pub fn key(&self) -> &BlobKey {
        &self.key
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }

    /// Mime type, fetched together with the metadata if not yet known
    pub async fn mime_type(&self) -> Result<&str> {
        Ok(&self.attributes().await?.mime_type)
    }

    /// User metadata, fetched from the backend on first call
    pub async fn metadata(&self) -> Result<&Metadata> {
        Ok(&self.attributes().await?.metadata)
    }

    /// Whether metadata has been resolved already
    pub fn is_resolved(&self) -> bool {
        self.attributes.initialized()
    }

    /// Insert or overwrite a metadata entry locally
    ///
    /// Never contacts the backend. The stored blob only changes when the
    /// descriptor is written back with `put`.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        match self.attributes.get_mut() {
            Some(attributes) => {
                attributes.metadata.insert(key, value);
            }
            None => {
                self.pending.insert(key, value);
            }
        }
    }

    /// Whether `content_range` is supported
    ///
    /// Range support does not make the returned streams seekable; each range
    /// request opens an independent stream.
    pub fn is_seekable(&self) -> bool {
        !matches!(self.content, Content::Stream(_))
    }

    /// Open a fresh stream over the whole blob
    pub async fn content(&self) -> Result<ByteStream> {
        match &self.content {
            Content::Backend(backend) => {
                let object_key = self.key.require_object()?;
                backend
                    .get_object(self.key.repository(), object_key, None)
                    .await
            }
            Content::Buffer(data) => Ok(bytes_stream(data.clone())),
            Content::Stream(slot) => slot.lock().await.take().ok_or_else(|| {
                Error::ContractViolation(format!("content stream of {} was already consumed", self.key))
            }),
        }
    }

    /// Open a stream over `length` bytes starting at `start`
    pub async fn content_range(&self, start: u64, length: u64) -> Result<ByteStream> {
        if start.checked_add(length).is_none() {
            return Err(Error::ContractViolation(format!(
                "byte range {start}+{length} overflows"
            )));
        }
        let range = ByteRange::new(start, length);
        if range.is_empty() {
            return Ok(bytes_stream(Bytes::new()));
        }
        match &self.content {
            Content::Backend(backend) => {
                let object_key = self.key.require_object()?;
                backend
                    .get_object(self.key.repository(), object_key, Some(range))
                    .await
            }
            Content::Buffer(data) => Ok(bytes_stream(slice_range(data, range)?)),
            Content::Stream(_) => Err(Error::ContractViolation(format!(
                "content of {} is a one-shot stream and cannot be read by range",
                self.key
            ))),
        }
    }

    async fn attributes(&self) -> Result<&Attributes> {
        self.attributes
            .get_or_try_init(|| async {
                let Content::Backend(backend) = &self.content else {
                    return Err(Error::ContractViolation(format!(
                        "local descriptor {} has no metadata source",
                        self.key
                    )));
                };
                let object_key = self.key.require_object()?;
                debug!(key = %self.key, "resolving blob metadata");
                let head = backend.head_object(self.key.repository(), object_key).await?;
                let mut metadata = head.user_metadata;
                metadata.extend(self.pending.clone());
                Ok(Attributes {
                    mime_type: head.mime_type,
                    metadata,
                })
            })
            .await
    }
}

impl fmt::Debug for BlobResourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.content {
            Content::Backend(ref backend) => backend.kind().to_string(),
            Content::Buffer(_) => "buffer".to_string(),
            Content::Stream(_) => "stream".to_string(),
        };
        f.debug_struct("BlobResourceInfo")
            .field("key", &self.key)
            .field("content_length", &self.content_length)
            .field("last_modified", &self.last_modified)
            .field("attributes", &self.attributes.get())
            .field("source", &source)
            .finish()
    }
}
