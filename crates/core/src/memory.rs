//! In-process storage backend
//!
//! Keeps repositories and objects in ordered maps behind an async lock.
//! Listing walks keys in lexicographic order and pages with a start-after
//! cursor, so it exercises the same pagination contract as a remote store.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::stream::{ByteStream, bytes_stream, read_to_bytes, slice_range};
use crate::traits::{
    BackendKind, ByteRange, ListCursor, Metadata, ObjectAcl, ObjectHead, ObjectListing,
    ObjectSummary, PutObjectRequest, StorageBackend,
};

/// Default number of summaries per listing page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    mime_type: String,
    metadata: Metadata,
    last_modified: Timestamp,
    acl: ObjectAcl,
    storage_class: Option<String>,
}

type Repositories = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Storage backend that lives entirely in memory
#[derive(Debug)]
pub struct MemoryBackend {
    page_size: usize,
    repositories: RwLock<Repositories>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Backend returning at most `page_size` summaries per listing page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            repositories: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Access control and storage class an object was stored with
    pub async fn object_policy(
        &self,
        repository: &str,
        key: &str,
    ) -> Option<(ObjectAcl, Option<String>)> {
        let repositories = self.repositories.read().await;
        repositories
            .get(repository)
            .and_then(|objects| objects.get(key))
            .map(|o| (o.acl, o.storage_class.clone()))
    }

    async fn page(
        &self,
        repository: &str,
        prefix: Option<&str>,
        start_after: Option<&str>,
    ) -> Result<ObjectListing> {
        let repositories = self.repositories.read().await;
        let objects = repositories
            .get(repository)
            .ok_or_else(|| Error::NotFound(format!("repository {repository}")))?;

        let lower = match start_after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let prefix = prefix.filter(|p| !p.is_empty());
        let mut matching = objects
            .range::<str, _>((lower, Bound::Unbounded))
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)));

        let summaries: Vec<ObjectSummary> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: object.last_modified,
            })
            .collect();
        let truncated = matching.next().is_some();

        let cursor = match summaries.last() {
            Some(last) if truncated => Some(ListCursor::Memory {
                repository: repository.to_string(),
                prefix: prefix.map(str::to_string),
                start_after: last.key.clone(),
            }),
            _ => None,
        };

        Ok(ObjectListing {
            repository: repository.to_string(),
            summaries,
            cursor,
            truncated,
        })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectHead> {
        let repositories = self.repositories.read().await;
        let object = repositories
            .get(repository)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| Error::NotFound(format!("{repository}/{key}")))?;

        Ok(ObjectHead {
            size: object.data.len() as u64,
            mime_type: object.mime_type.clone(),
            last_modified: object.last_modified,
            user_metadata: object.metadata.clone(),
        })
    }

    async fn get_object(
        &self,
        repository: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ByteStream> {
        let data = {
            let repositories = self.repositories.read().await;
            repositories
                .get(repository)
                .and_then(|objects| objects.get(key))
                .map(|o| o.data.clone())
                .ok_or_else(|| Error::NotFound(format!("{repository}/{key}")))?
        };

        match range {
            Some(range) => Ok(bytes_stream(slice_range(&data, range)?)),
            None => Ok(bytes_stream(data)),
        }
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        if !self.bucket_exists(&request.repository).await? {
            return Err(Error::NotFound(format!("repository {}", request.repository)));
        }

        let data = read_to_bytes(request.body).await?;
        if data.len() as u64 != request.content_length {
            return Err(Error::Transfer(format!(
                "declared {} bytes for {}/{} but received {}",
                request.content_length,
                request.repository,
                request.key,
                data.len()
            )));
        }

        let object = StoredObject {
            data,
            mime_type: request.mime_type,
            metadata: request.metadata,
            last_modified: Timestamp::now(),
            acl: request.acl,
            storage_class: request.storage_class,
        };

        let mut repositories = self.repositories.write().await;
        let objects = repositories
            .get_mut(&request.repository)
            .ok_or_else(|| Error::NotFound(format!("repository {}", request.repository)))?;
        objects.insert(request.key, object);
        Ok(())
    }

    async fn delete_object(&self, repository: &str, key: &str) -> Result<()> {
        let mut repositories = self.repositories.write().await;
        repositories
            .get_mut(repository)
            .and_then(|objects| objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{repository}/{key}")))
    }

    async fn list_objects(&self, repository: &str, prefix: &str) -> Result<ObjectListing> {
        self.page(repository, Some(prefix), None).await
    }

    async fn list_objects_next(&self, cursor: &ListCursor) -> Result<ObjectListing> {
        match cursor {
            ListCursor::Memory {
                repository,
                prefix,
                start_after,
            } => {
                self.page(repository, prefix.as_deref(), Some(start_after))
                    .await
            }
            other => Err(Error::ContractViolation(format!(
                "{} cursor passed to the memory backend",
                other.backend()
            ))),
        }
    }

    async fn bucket_exists(&self, repository: &str) -> Result<bool> {
        Ok(self.repositories.read().await.contains_key(repository))
    }

    async fn create_bucket(&self, repository: &str, _location: Option<String>) -> Result<()> {
        let mut repositories = self.repositories.write().await;
        if repositories.contains_key(repository) {
            return Err(Error::Conflict(format!("repository {repository} already exists")));
        }
        repositories.insert(repository.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_bucket(&self, repository: &str) -> Result<()> {
        let mut repositories = self.repositories.write().await;
        match repositories.get(repository) {
            None => Err(Error::NotFound(format!("repository {repository}"))),
            Some(objects) if !objects.is_empty() => Err(Error::Transfer(format!(
                "repository {repository} is not empty"
            ))),
            Some(_) => {
                repositories.remove(repository);
                Ok(())
            }
        }
    }
}
