//! Key-addressed blob operations
//!
//! A [`StoreAgent`] performs put/get/delete/list for any repository of one
//! backend, addressing blobs by [`BlobKey`]. [`Repository`](crate::Repository)
//! handles are thin wrappers that pin the repository name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collection::PartialCollection;
use crate::error::{Error, Result};
use crate::key::BlobKey;
use crate::resource::BlobResourceInfo;
use crate::traits::{BackendKind, ObjectAcl, ObjectListing, PutObjectRequest, StorageBackend};

/// Storage class used for `StorePriority::Min` unless configured otherwise
pub const DEFAULT_MIN_TIER: &str = "REDUCED_REDUNDANCY";

/// Durability/cost priority requested for a stored blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorePriority {
    #[default]
    Default,
    /// Cheaper, less durable storage if the backend offers it
    Min,
}

/// Mapping from [`StorePriority`] to backend storage class names
///
/// `None` leaves the choice to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default = "default_min_tier", skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
}

fn default_min_tier() -> Option<String> {
    Some(DEFAULT_MIN_TIER.to_string())
}

impl Default for StorageTiers {
    fn default() -> Self {
        Self {
            default: None,
            min: default_min_tier(),
        }
    }
}

impl StorageTiers {
    /// Storage class hint for a priority
    pub fn for_priority(&self, priority: StorePriority) -> Option<&str> {
        match priority {
            StorePriority::Default => self.default.as_deref(),
            StorePriority::Min => self.min.as_deref(),
        }
    }
}

/// Blob operations over every repository of one backend
#[derive(Clone)]
pub struct StoreAgent {
    backend: Arc<dyn StorageBackend>,
    tiers: StorageTiers,
}

impl StoreAgent {
    pub fn new(backend: Arc<dyn StorageBackend>, tiers: StorageTiers) -> Self {
        Self { backend, tiers }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Store `info`'s content, type and metadata under its key
    ///
    /// Replaces any existing object. The content stream is owned by the
    /// backend call and released however the transfer ends.
    pub async fn put(
        &self,
        info: &BlobResourceInfo,
        public_readable: bool,
        priority: StorePriority,
    ) -> Result<()> {
        let key = info.key();
        let object_key = key.require_object()?.to_string();
        let mime_type = info.mime_type().await?.to_string();
        let metadata = info.metadata().await?.clone();
        let body = info.content().await?;

        let request = PutObjectRequest {
            repository: key.repository().to_string(),
            key: object_key,
            body,
            content_length: info.content_length(),
            mime_type,
            metadata,
            acl: if public_readable {
                ObjectAcl::PublicRead
            } else {
                ObjectAcl::Private
            },
            storage_class: self.tiers.for_priority(priority).map(str::to_string),
        };

        debug!(key = %key, size = request.content_length, ?priority, "storing blob");
        self.backend.put_object(request).await
    }

    /// Descriptor of an existing blob; metadata is already resolved
    pub async fn get(&self, key: &BlobKey) -> Result<BlobResourceInfo> {
        let object_key = key.require_object()?;
        let head = self.backend.head_object(key.repository(), object_key).await?;
        Ok(BlobResourceInfo::from_head(
            key.clone(),
            head,
            Arc::clone(&self.backend),
        ))
    }

    /// Remove a blob; removing a missing blob is not an error
    pub async fn delete(&self, key: &BlobKey) -> Result<()> {
        let object_key = key.require_object()?;
        match self.backend.delete_object(key.repository(), object_key).await {
            Err(Error::NotFound(_)) => {
                debug!(key = %key, "blob already absent");
                Ok(())
            }
            other => other,
        }
    }

    /// First page of blobs whose key starts with `prefix.key()`
    pub async fn list(&self, prefix: &BlobKey) -> Result<PartialCollection> {
        if prefix.repository().is_empty() {
            return Err(Error::ContractViolation(
                "repository name cannot be empty".into(),
            ));
        }
        let listing = self
            .backend
            .list_objects(prefix.repository(), prefix.prefix().unwrap_or_default())
            .await?;
        self.to_collection(listing)
    }

    /// Page following `collection`
    ///
    /// A collection without further pages yields an empty final page. A
    /// cursor issued by another backend kind is rejected.
    pub async fn list_next(&self, collection: &PartialCollection) -> Result<PartialCollection> {
        if !collection.has_more() {
            return Ok(PartialCollection::new(Vec::new(), false, None));
        }
        let cursor = collection.cursor().ok_or_else(|| {
            Error::ContractViolation("collection reports more pages but carries no cursor".into())
        })?;
        if cursor.backend() != self.backend.kind() {
            return Err(Error::ContractViolation(format!(
                "{} cursor passed to a {} store",
                cursor.backend(),
                self.backend.kind()
            )));
        }
        let listing = self.backend.list_objects_next(cursor).await?;
        self.to_collection(listing)
    }

    /// Every blob under `prefix`, following cursors until the last page
    pub async fn list_all(&self, prefix: &BlobKey) -> Result<Vec<BlobResourceInfo>> {
        let mut page = self.list(prefix).await?;
        let mut items = Vec::new();
        loop {
            let next = if page.has_more() {
                Some(self.list_next(&page).await?)
            } else {
                None
            };
            items.extend(page);
            match next {
                Some(next) => page = next,
                None => return Ok(items),
            }
        }
    }

    fn to_collection(&self, listing: ObjectListing) -> Result<PartialCollection> {
        if listing.truncated && listing.cursor.is_none() {
            warn!(repository = %listing.repository, "truncated listing without cursor");
            return Err(Error::Transfer(format!(
                "backend returned a truncated listing of {} without a cursor",
                listing.repository
            )));
        }
        let items = listing
            .summaries
            .into_iter()
            .map(|s| {
                BlobResourceInfo::from_summary(&listing.repository, s, Arc::clone(&self.backend))
            })
            .collect();
        Ok(PartialCollection::new(items, listing.truncated, listing.cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::stream::read_to_bytes;
    use crate::traits::{ListCursor, MockStorageBackend, ObjectListing};

    fn agent(backend: impl StorageBackend + 'static) -> StoreAgent {
        StoreAgent::new(Arc::new(backend), StorageTiers::default())
    }

    async fn memory_agent(page_size: usize) -> (StoreAgent, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::with_page_size(page_size));
        backend.create_bucket("repo", None).await.unwrap();
        let agent = StoreAgent::new(backend.clone(), StorageTiers::default());
        (agent, backend)
    }

    #[test]
    fn test_tier_mapping() {
        let tiers = StorageTiers::default();
        assert_eq!(tiers.for_priority(StorePriority::Default), None);
        assert_eq!(tiers.for_priority(StorePriority::Min), Some(DEFAULT_MIN_TIER));

        let tiers = StorageTiers {
            default: Some("STANDARD".into()),
            min: Some("ONEZONE_IA".into()),
        };
        assert_eq!(tiers.for_priority(StorePriority::Default), Some("STANDARD"));
        assert_eq!(tiers.for_priority(StorePriority::Min), Some("ONEZONE_IA"));
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (agent, _) = memory_agent(10).await;
        let key = BlobKey::new("repo", "b001");
        let mut info = BlobResourceInfo::from_bytes(key.clone(), "text/plain", "hello");
        info.add_metadata("author", "test");
        info.add_metadata("price", "99.0");
        agent.put(&info, false, StorePriority::Default).await.unwrap();

        let stored = agent.get(&key).await.unwrap();
        assert_eq!(stored.key(), &key);
        assert_eq!(stored.content_length(), 5);
        assert_eq!(stored.mime_type().await.unwrap(), "text/plain");
        let metadata = stored.metadata().await.unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("author").unwrap(), "test");

        let data = read_to_bytes(stored.content().await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"hello");
        let part = read_to_bytes(stored.content_range(2, 2).await.unwrap()).await.unwrap();
        assert_eq!(&part[..], b"ll");
    }

    #[tokio::test]
    async fn test_put_applies_acl_and_tier() {
        let (agent, backend) = memory_agent(10).await;
        let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", "b002"), "text/plain", "foo");
        agent.put(&info, true, StorePriority::Min).await.unwrap();

        let (acl, class) = backend.object_policy("repo", "b002").await.unwrap();
        assert_eq!(acl, ObjectAcl::PublicRead);
        assert_eq!(class.as_deref(), Some(DEFAULT_MIN_TIER));
    }

    #[tokio::test]
    async fn test_put_requires_object_key() {
        let (agent, _) = memory_agent(10).await;
        let info = BlobResourceInfo::from_bytes(BlobKey::repository_root("repo"), "text/plain", "x");
        assert!(matches!(
            agent.put(&info, false, StorePriority::Default).await,
            Err(Error::ContractViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (agent, _) = memory_agent(10).await;
        let key = BlobKey::new("repo", "b001");
        for body in ["hello", "woo"] {
            let info = BlobResourceInfo::from_bytes(key.clone(), "text/plain", body);
            agent.put(&info, false, StorePriority::Default).await.unwrap();
        }
        let stored = agent.get(&key).await.unwrap();
        let data = read_to_bytes(stored.content().await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"woo");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (agent, _) = memory_agent(10).await;
        let key = BlobKey::new("repo", "b001");
        let info = BlobResourceInfo::from_bytes(key.clone(), "text/plain", "x");
        agent.put(&info, false, StorePriority::Default).await.unwrap();

        agent.delete(&key).await.unwrap();
        assert!(agent.get(&key).await.unwrap_err().is_not_found());
        agent.delete(&key).await.unwrap();
        agent.delete(&BlobKey::new("repo", "noneExists")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_propagates_transfer_errors() {
        let mut backend = MockStorageBackend::new();
        backend
            .expect_delete_object()
            .returning(|_, _| Err(Error::Transfer("access denied".into())));
        let agent = agent(backend);
        assert!(matches!(
            agent.delete(&BlobKey::new("repo", "k")).await,
            Err(Error::Transfer(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (agent, _) = memory_agent(10).await;
        let err = agent.get(&BlobKey::new("repo", "noneExists")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_entries_are_lazy() {
        let (agent, _) = memory_agent(10).await;
        let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", "a"), "image/png", "abc");
        agent.put(&info, false, StorePriority::Default).await.unwrap();

        let page = agent.list(&BlobKey::repository_root("repo")).await.unwrap();
        assert_eq!(page.len(), 1);
        assert!(!page[0].is_resolved());
        assert_eq!(page[0].content_length(), 3);
        assert_eq!(page[0].mime_type().await.unwrap(), "image/png");
        assert!(page[0].is_resolved());
    }

    #[tokio::test]
    async fn test_pages_cover_every_key_once() {
        let (agent, _) = memory_agent(3).await;
        let keys: Vec<String> = (0..10).map(|i| format!("k{i:02}")).collect();
        for key in &keys {
            let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", key.as_str()), "text/plain", "x");
            agent.put(&info, false, StorePriority::Default).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut page = agent.list(&BlobKey::repository_root("repo")).await.unwrap();
        let mut pages = 1;
        loop {
            seen.extend(page.iter().filter_map(|i| i.key().key().map(str::to_string)));
            if !page.has_more() {
                break;
            }
            page = agent.list_next(&page).await.unwrap();
            pages += 1;
        }
        assert_eq!(pages, 4);
        assert_eq!(seen, keys);

        let all = agent.list_all(&BlobKey::repository_root("repo")).await.unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn test_list_next_after_last_page() {
        let (agent, _) = memory_agent(10).await;
        let page = agent.list(&BlobKey::repository_root("repo")).await.unwrap();
        assert!(!page.has_more());
        let next = agent.list_next(&page).await.unwrap();
        assert!(next.is_empty());
        assert!(!next.has_more());
    }

    #[tokio::test]
    async fn test_list_next_rejects_foreign_cursor() {
        let mut backend = MockStorageBackend::new();
        backend.expect_kind().return_const(BackendKind::Memory);
        backend.expect_list_objects().returning(|repo, _| {
            Ok(ObjectListing {
                repository: repo.to_string(),
                summaries: Vec::new(),
                cursor: Some(ListCursor::S3 {
                    bucket: repo.to_string(),
                    prefix: None,
                    continuation_token: "token".into(),
                }),
                truncated: true,
            })
        });
        backend.expect_list_objects_next().never();

        let agent = agent(backend);
        let page = agent.list(&BlobKey::repository_root("repo")).await.unwrap();
        assert!(matches!(
            agent.list_next(&page).await,
            Err(Error::ContractViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_listing_without_cursor() {
        let mut backend = MockStorageBackend::new();
        backend.expect_list_objects().returning(|repo, _| {
            Ok(ObjectListing {
                repository: repo.to_string(),
                summaries: Vec::new(),
                cursor: None,
                truncated: true,
            })
        });
        let agent = agent(backend);
        assert!(matches!(
            agent.list(&BlobKey::repository_root("repo")).await,
            Err(Error::Transfer(_))
        ));
    }

    #[tokio::test]
    async fn test_list_requires_repository() {
        let (agent, _) = memory_agent(10).await;
        assert!(matches!(
            agent.list(&BlobKey::repository_root("")).await,
            Err(Error::ContractViolation(_))
        ));
    }
}
