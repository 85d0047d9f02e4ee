//! Blob path parsing
//!
//! Command line locations are written `profile/repository[/key]`. The key
//! part may itself contain slashes.

use crate::error::{Error, Result};
use crate::key::BlobKey;
use crate::profile::is_valid_profile_name;

/// A location inside a named profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    pub profile: String,
    pub key: BlobKey,
}

impl BlobPath {
    pub fn repository(&self) -> &str {
        self.key.repository()
    }

    /// Object key, `None` when the path names the repository itself
    pub fn object_key(&self) -> Option<&str> {
        self.key.key()
    }

    /// Object key, required for single-blob commands
    pub fn require_object(&self) -> Result<&str> {
        self.object_key()
            .ok_or_else(|| Error::InvalidPath(format!("'{self}' does not name a blob")))
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.profile, self.key)
    }
}

/// Parse `profile/repository[/key]`
///
/// A trailing slash after the repository is allowed and means "no key".
pub fn parse_blob_path(path: &str) -> Result<BlobPath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("path cannot be empty".into()));
    }

    let mut parts = path.splitn(3, '/');
    let profile = parts.next().unwrap_or_default();
    let repository = parts.next().ok_or_else(|| {
        Error::InvalidPath(format!(
            "path '{path}' is incomplete. Use format: profile/repository[/key]"
        ))
    })?;
    let key = parts.next().unwrap_or_default();

    if !is_valid_profile_name(profile) {
        return Err(Error::InvalidPath(format!("invalid profile name '{profile}'")));
    }
    if repository.is_empty() {
        return Err(Error::InvalidPath("repository name cannot be empty".into()));
    }

    Ok(BlobPath {
        profile: profile.to_string(),
        key: BlobKey::new(repository, key),
    })
}
