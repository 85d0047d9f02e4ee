//! bs-core: backend-agnostic blob storage
//!
//! This crate provides:
//! - [`BlobKey`] addressing and [`BlobResourceInfo`] descriptors with lazily
//!   fetched type and metadata
//! - [`Blobstore`], [`Repository`] and [`StoreAgent`] operations
//! - Paginated listing through [`PartialCollection`]
//! - The [`StorageBackend`] trait and an in-process [`MemoryBackend`]
//! - Configuration and profile management for the `bs` CLI
//!
//! Nothing here depends on a particular object store SDK; the S3 adapter
//! lives in `bs-s3`.

pub mod agent;
pub mod blobstore;
pub mod collection;
pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod path;
pub mod profile;
pub mod repository;
pub mod resource;
pub mod stream;
pub mod traits;

pub use agent::{StorageTiers, StoreAgent, StorePriority};
pub use blobstore::{Blobstore, BlobstoreConfig};
pub use collection::PartialCollection;
pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use key::BlobKey;
pub use memory::MemoryBackend;
pub use path::{BlobPath, parse_blob_path};
pub use profile::{BucketLookup, Profile, ProfileManager, TimeoutConfig};
pub use repository::Repository;
pub use resource::BlobResourceInfo;
pub use stream::ByteStream;
pub use traits::{
    BackendKind, ByteRange, DEFAULT_MIME_TYPE, ListCursor, Metadata, ObjectAcl, ObjectHead,
    ObjectListing, ObjectSummary, PutObjectRequest, StorageBackend,
};
