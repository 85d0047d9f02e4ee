//! End-to-end behavior of the blob abstraction over the in-memory backend

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bs_core::stream::{bytes_stream, read_to_bytes};
use bs_core::{
    BackendKind, BlobKey, BlobResourceInfo, Blobstore, BlobstoreConfig, ByteRange, ByteStream,
    Error, ListCursor, MemoryBackend, ObjectAcl, ObjectHead, ObjectListing, PutObjectRequest,
    Result, StorageBackend, StorePriority,
};
use bytes::Bytes;

/// Memory backend whose head lookups are slow and counted
struct SlowHeadBackend {
    inner: MemoryBackend,
    heads: AtomicUsize,
}

impl SlowHeadBackend {
    fn new(page_size: usize) -> Self {
        Self {
            inner: MemoryBackend::with_page_size(page_size),
            heads: AtomicUsize::new(0),
        }
    }

    fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for SlowHeadBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectHead> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.head_object(repository, key).await
    }

    async fn get_object(
        &self,
        repository: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ByteStream> {
        self.inner.get_object(repository, key, range).await
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        self.inner.put_object(request).await
    }

    async fn delete_object(&self, repository: &str, key: &str) -> Result<()> {
        self.inner.delete_object(repository, key).await
    }

    async fn list_objects(&self, repository: &str, prefix: &str) -> Result<ObjectListing> {
        self.inner.list_objects(repository, prefix).await
    }

    async fn list_objects_next(&self, cursor: &ListCursor) -> Result<ObjectListing> {
        self.inner.list_objects_next(cursor).await
    }

    async fn bucket_exists(&self, repository: &str) -> Result<bool> {
        self.inner.bucket_exists(repository).await
    }

    async fn create_bucket(&self, repository: &str, location: Option<String>) -> Result<()> {
        self.inner.create_bucket(repository, location).await
    }

    async fn delete_bucket(&self, repository: &str) -> Result<()> {
        self.inner.delete_bucket(repository).await
    }
}

async fn store_with(page_size: usize, keys: &[&str]) -> Blobstore {
    let store = Blobstore::new(
        Arc::new(MemoryBackend::with_page_size(page_size)),
        BlobstoreConfig::default(),
    );
    store.create("repo").await.unwrap();
    let agent = store.store_agent();
    for key in keys {
        let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", *key), "text/plain", "x");
        agent.put(&info, false, StorePriority::Default).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_prefix_listing_walks_pages() {
    let store = store_with(2, &["a", "r", "r-j001", "r-j002", "r-c-c001"]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    let first = repo.list(Some("r-")).await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.has_more());
    assert!(first.cursor().is_some());

    let second = repo.list_next(&first).await.unwrap();
    assert_eq!(second.len(), 1);
    assert!(!second.has_more());
    assert!(second.cursor().is_none());

    let mut keys: Vec<String> = first
        .iter()
        .chain(second.iter())
        .filter_map(|info| info.key().key().map(str::to_string))
        .collect();
    keys.sort();
    assert_eq!(keys, ["r-c-c001", "r-j001", "r-j002"]);

    let after_last = repo.list_next(&second).await.unwrap();
    assert!(after_last.is_empty());
    assert!(!after_last.has_more());
}

fn sorted_keys(page: &bs_core::PartialCollection) -> Vec<String> {
    let mut keys: Vec<String> = page
        .iter()
        .filter_map(|info| info.key().key().map(str::to_string))
        .collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_prefix_listing_on_single_page() {
    let backend = Arc::new(MemoryBackend::new());
    assert!(backend.page_size() >= 5);
    let store = Blobstore::new(backend, BlobstoreConfig::default());
    store.create("repo").await.unwrap();
    let agent = store.store_agent();
    for key in ["a", "r", "r-j001", "r-j002", "r-c-c001"] {
        let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", key), "text/plain", "x");
        agent.put(&info, false, StorePriority::Default).await.unwrap();
    }

    let all = agent.list(&BlobKey::new("repo", "")).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(!all.has_more());
    assert_eq!(sorted_keys(&all), ["a", "r", "r-c-c001", "r-j001", "r-j002"]);

    let dashed = agent.list(&BlobKey::new("repo", "r-")).await.unwrap();
    assert!(!dashed.has_more());
    assert_eq!(sorted_keys(&dashed), ["r-c-c001", "r-j001", "r-j002"]);

    let nested = agent.list(&BlobKey::new("repo", "r-c-")).await.unwrap();
    assert!(!nested.has_more());
    assert_eq!(sorted_keys(&nested), ["r-c-c001"]);

    let repo = store.get_repository("repo").await.unwrap().unwrap();
    assert_eq!(sorted_keys(&repo.list(Some("r-c-")).await.unwrap()), ["r-c-c001"]);
}

#[tokio::test]
async fn test_list_all_matches_paged_walk() {
    let store = store_with(1, &["a", "r", "r-j001", "r-j002", "r-c-c001"]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    let all = repo.list_all(None).await.unwrap();
    assert_eq!(all.len(), 5);
    let prefixed = repo.list_all(Some("r")).await.unwrap();
    assert_eq!(prefixed.len(), 4);
}

#[tokio::test]
async fn test_round_trip_preserves_content_and_metadata() {
    let store = store_with(10, &[]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    let mut info = BlobResourceInfo::from_bytes(repo.key("doc.json"), "application/json", "{\"a\":1}");
    info.add_metadata("owner", "alice");
    repo.put(&info, true, StorePriority::Min).await.unwrap();

    let stored = repo.get("doc.json").await.unwrap();
    assert!(stored.is_resolved());
    assert_eq!(stored.content_length(), 7);
    assert_eq!(stored.mime_type().await.unwrap(), "application/json");
    assert_eq!(stored.metadata().await.unwrap().get("owner").map(String::as_str), Some("alice"));

    let body = read_to_bytes(stored.content().await.unwrap()).await.unwrap();
    assert_eq!(&body[..], b"{\"a\":1}");
    let slice = read_to_bytes(stored.content_range(1, 3).await.unwrap()).await.unwrap();
    assert_eq!(&slice[..], b"\"a\"");
}

#[tokio::test]
async fn test_put_replaces_existing_blob() {
    let store = store_with(10, &[]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    for body in ["first", "second!"] {
        let info = BlobResourceInfo::from_bytes(repo.key("k"), "text/plain", body);
        repo.put(&info, false, StorePriority::Default).await.unwrap();
    }
    assert_eq!(repo.get("k").await.unwrap().content_length(), 7);
    assert_eq!(repo.list_all(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_streamed_put_and_consumed_stream() {
    let store = store_with(10, &[]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    let stream = bytes_stream(Bytes::from_static(b"streamed"));
    let info = BlobResourceInfo::from_stream(repo.key("s"), "text/plain", stream, 8);
    assert!(!info.is_seekable());
    repo.put(&info, false, StorePriority::Default).await.unwrap();

    assert!(matches!(
        repo.put(&info, false, StorePriority::Default).await,
        Err(Error::ContractViolation(_))
    ));
    assert_eq!(repo.get("s").await.unwrap().content_length(), 8);
}

#[tokio::test]
async fn test_missing_blob_and_repository() {
    let store = store_with(10, &[]).await;
    let repo = store.get_repository("repo").await.unwrap().unwrap();

    assert!(repo.get("nope").await.unwrap_err().is_not_found());
    repo.delete("nope").await.unwrap();
    assert!(store.get_repository("absent").await.unwrap().is_none());
    store.delete("absent").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_metadata_access_fetches_once() {
    let backend = Arc::new(SlowHeadBackend::new(10));
    let store = Blobstore::new(backend.clone(), BlobstoreConfig::default());
    store.create("repo").await.unwrap();

    let mut info = BlobResourceInfo::from_bytes(BlobKey::new("repo", "k"), "image/png", "png");
    info.add_metadata("width", "10");
    store
        .store_agent()
        .put(&info, false, StorePriority::Default)
        .await
        .unwrap();

    let page = store.store_agent().list(&BlobKey::repository_root("repo")).await.unwrap();
    let listed = Arc::new(page.into_items().remove(0));
    assert!(!listed.is_resolved());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let listed = Arc::clone(&listed);
            tokio::spawn(async move { listed.metadata().await.map(|m| m.clone()) })
        })
        .collect();
    for task in tasks {
        let metadata = task.await.unwrap().unwrap();
        assert_eq!(metadata.get("width").map(String::as_str), Some("10"));
    }

    assert_eq!(listed.mime_type().await.unwrap(), "image/png");
    assert_eq!(backend.heads(), 1);
}

#[tokio::test]
async fn test_metadata_added_before_resolution_wins() {
    let store = store_with(10, &[]).await;
    let agent = store.store_agent();
    let mut info = BlobResourceInfo::from_bytes(BlobKey::new("repo", "k"), "text/plain", "x");
    info.add_metadata("color", "red");
    info.add_metadata("size", "s");
    agent.put(&info, false, StorePriority::Default).await.unwrap();

    let page = agent.list(&BlobKey::repository_root("repo")).await.unwrap();
    let mut listed = page.into_items().remove(0);
    listed.add_metadata("color", "blue");

    let metadata = listed.metadata().await.unwrap();
    assert_eq!(metadata.get("color").map(String::as_str), Some("blue"));
    assert_eq!(metadata.get("size").map(String::as_str), Some("s"));
}

#[tokio::test]
async fn test_priority_and_acl_reach_backend() {
    let backend = Arc::new(MemoryBackend::new());
    let store = Blobstore::new(backend.clone(), BlobstoreConfig::default());
    store.create("repo").await.unwrap();

    let info = BlobResourceInfo::from_bytes(BlobKey::new("repo", "cheap"), "text/plain", "x");
    store
        .store_agent()
        .put(&info, true, StorePriority::Min)
        .await
        .unwrap();

    let (acl, class) = backend.object_policy("repo", "cheap").await.unwrap();
    assert_eq!(acl, ObjectAcl::PublicRead);
    assert_eq!(class.as_deref(), Some("REDUCED_REDUNDANCY"));
}
