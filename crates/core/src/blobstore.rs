//! Repository management
//!
//! The [`Blobstore`] is the entry point: it owns the backend reference and
//! configuration, checks and creates repositories, and hands out
//! [`Repository`] handles.

use std::sync::Arc;

use tracing::debug;

use crate::agent::{StorageTiers, StoreAgent};
use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::traits::StorageBackend;

/// Settings a [`Blobstore`] passes on to its backend calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobstoreConfig {
    /// Location constraint used when creating repositories
    pub location: Option<String>,

    /// Storage class mapping for put priorities
    pub storage_tiers: StorageTiers,
}

/// Creates, checks and deletes repositories of one backend
#[derive(Clone)]
pub struct Blobstore {
    backend: Arc<dyn StorageBackend>,
    config: BlobstoreConfig,
}

impl Blobstore {
    pub fn new(backend: Arc<dyn StorageBackend>, config: BlobstoreConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &BlobstoreConfig {
        &self.config
    }

    /// Key-addressed operations over every repository of this store
    pub fn store_agent(&self) -> StoreAgent {
        StoreAgent::new(Arc::clone(&self.backend), self.config.storage_tiers.clone())
    }

    pub async fn exist(&self, name: &str) -> Result<bool> {
        require_name(name)?;
        self.backend.bucket_exists(name).await
    }

    /// Create a repository at the configured location
    pub async fn create(&self, name: &str) -> Result<()> {
        require_name(name)?;
        debug!(repository = name, location = ?self.config.location, "creating repository");
        self.backend
            .create_bucket(name, self.config.location.clone())
            .await
    }

    /// Delete a repository; deleting a missing repository is not an error
    pub async fn delete(&self, name: &str) -> Result<()> {
        require_name(name)?;
        match self.backend.delete_bucket(name).await {
            Err(Error::NotFound(_)) => {
                debug!(repository = name, "repository already absent");
                Ok(())
            }
            other => other,
        }
    }

    /// Handle for an existing repository, `None` if it does not exist
    pub async fn get_repository(&self, name: &str) -> Result<Option<Repository>> {
        if self.exist(name).await? {
            Ok(Some(Repository::new(name, self.store_agent())))
        } else {
            Ok(None)
        }
    }
}

impl std::fmt::Debug for Blobstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blobstore")
            .field("backend", &self.backend.kind())
            .field("config", &self.config)
            .finish()
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        Err(Error::ContractViolation(
            "repository name cannot be empty".into(),
        ))
    } else {
        Ok(())
    }
}
