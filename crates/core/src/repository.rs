//! Repository handles
//!
//! A [`Repository`] is a [`StoreAgent`] pinned to one repository name. It has
//! no state of its own beyond that name and the backend reference.

use crate::agent::{StoreAgent, StorePriority};
use crate::collection::PartialCollection;
use crate::error::{Error, Result};
use crate::key::BlobKey;
use crate::resource::BlobResourceInfo;

/// Blob operations scoped to one named repository
#[derive(Clone)]
pub struct Repository {
    name: String,
    agent: StoreAgent,
}

impl Repository {
    pub(crate) fn new(name: impl Into<String>, agent: StoreAgent) -> Self {
        Self {
            name: name.into(),
            agent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key for `key` inside this repository
    pub fn key(&self, key: impl Into<String>) -> BlobKey {
        BlobKey::new(self.name.as_str(), key)
    }

    /// Store a blob; its key must belong to this repository
    pub async fn put(
        &self,
        info: &BlobResourceInfo,
        public_readable: bool,
        priority: StorePriority,
    ) -> Result<()> {
        self.check_owned(info.key().repository(), "blob")?;
        self.agent.put(info, public_readable, priority).await
    }

    pub async fn get(&self, key: &str) -> Result<BlobResourceInfo> {
        self.agent.get(&self.key(key)).await
    }

    /// Remove a blob; removing a missing blob is not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.agent.delete(&self.key(key)).await
    }

    /// First page of blobs, optionally filtered by key prefix
    pub async fn list(&self, prefix: Option<&str>) -> Result<PartialCollection> {
        self.agent.list(&self.key(prefix.unwrap_or_default())).await
    }

    /// Page following `collection`, which must come from this repository
    pub async fn list_next(&self, collection: &PartialCollection) -> Result<PartialCollection> {
        if let Some(cursor) = collection.cursor() {
            self.check_owned(cursor.repository(), "cursor")?;
        }
        self.agent.list_next(collection).await
    }

    /// Every blob under `prefix`
    pub async fn list_all(&self, prefix: Option<&str>) -> Result<Vec<BlobResourceInfo>> {
        self.agent.list_all(&self.key(prefix.unwrap_or_default())).await
    }

    fn check_owned(&self, repository: &str, what: &str) -> Result<()> {
        if repository == self.name {
            Ok(())
        } else {
            Err(Error::ContractViolation(format!(
                "{what} of repository '{repository}' passed to repository '{}'",
                self.name
            )))
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("backend", &self.agent.backend_kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::StorageTiers;
    use crate::memory::MemoryBackend;
    use crate::traits::StorageBackend;

    async fn repository(name: &str, page_size: usize) -> Repository {
        let backend = Arc::new(MemoryBackend::with_page_size(page_size));
        backend.create_bucket("photos", None).await.unwrap();
        backend.create_bucket("docs", None).await.unwrap();
        Repository::new(name, StoreAgent::new(backend, StorageTiers::default()))
    }

    #[tokio::test]
    async fn test_put_rejects_foreign_key() {
        let repo = repository("photos", 10).await;
        let info = BlobResourceInfo::from_bytes(BlobKey::new("docs", "a"), "text/plain", "x");
        assert!(matches!(
            repo.put(&info, false, StorePriority::Default).await,
            Err(Error::ContractViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_scoped_round_trip() {
        let repo = repository("photos", 10).await;
        let info = BlobResourceInfo::from_bytes(repo.key("cat.jpg"), "image/jpeg", "meow");
        repo.put(&info, false, StorePriority::Default).await.unwrap();

        let stored = repo.get("cat.jpg").await.unwrap();
        assert_eq!(stored.key(), &BlobKey::new("photos", "cat.jpg"));
        assert_eq!(stored.content_length(), 4);

        repo.delete("cat.jpg").await.unwrap();
        repo.delete("cat.jpg").await.unwrap();
        assert!(repo.get("cat.jpg").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_next_rejects_other_repository_cursor() {
        let backend = Arc::new(MemoryBackend::with_page_size(1));
        backend.create_bucket("photos", None).await.unwrap();
        backend.create_bucket("docs", None).await.unwrap();
        let agent = StoreAgent::new(backend, StorageTiers::default());
        let photos = Repository::new("photos", agent.clone());
        let docs = Repository::new("docs", agent);

        for key in ["a", "b"] {
            let info = BlobResourceInfo::from_bytes(docs.key(key), "text/plain", "x");
            docs.put(&info, false, StorePriority::Default).await.unwrap();
        }

        let page = docs.list(None).await.unwrap();
        assert!(page.has_more());
        assert!(matches!(
            photos.list_next(&page).await,
            Err(Error::ContractViolation(_))
        ));
        let next = docs.list_next(&page).await.unwrap();
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_debug_shows_name() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let repo = Repository::new("photos", StoreAgent::new(backend, StorageTiers::default()));
        let debug = format!("{repo:?}");
        assert!(debug.contains("photos"));
        assert!(debug.contains("Memory"));
    }
}
