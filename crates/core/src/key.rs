//! Blob keys
//!
//! A [`BlobKey`] names a blob inside a repository. With no object key it
//! addresses the whole repository, which is only meaningful as a listing
//! filter.

use std::fmt;

use crate::error::{Error, Result};

/// Identifies a blob within a named repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
    repository: String,
    key: Option<String>,
}

impl BlobKey {
    /// Create a key for an object inside a repository
    ///
    /// An empty object key is stored as `None`, so `BlobKey::new("r", "")`
    /// equals `BlobKey::repository_root("r")`.
    pub fn new(repository: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            repository: repository.into(),
            key: (!key.is_empty()).then_some(key),
        }
    }

    /// Create a key that matches every blob of a repository
    pub fn repository_root(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            key: None,
        }
    }

    /// Repository (bucket) name
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Object key, `None` for the repository root
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Key used as a listing prefix; `None` lists everything
    pub fn prefix(&self) -> Option<&str> {
        self.key()
    }

    /// Object key of an addressable blob
    ///
    /// Fails with [`Error::ContractViolation`] when the key is absent or the
    /// repository name is empty.
    pub fn require_object(&self) -> Result<&str> {
        if self.repository.is_empty() {
            return Err(Error::ContractViolation(
                "repository name cannot be empty".into(),
            ));
        }
        self.key.as_deref().ok_or_else(|| {
            Error::ContractViolation(format!(
                "blob key in repository '{}' has no object key",
                self.repository
            ))
        })
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}/{}", self.repository, key),
            None => write!(f, "{}/", self.repository),
        }
    }
}
