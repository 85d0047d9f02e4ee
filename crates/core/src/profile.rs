//! Storage profiles
//!
//! A profile names an S3-compatible endpoint together with its credentials,
//! connection settings and the blobstore options the CLI applies to it.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::agent::StorageTiers;
use crate::blobstore::BlobstoreConfig;
use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Timeout configuration for a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub connect_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub read_ms: u64,
}

fn default_timeout() -> u64 {
    30_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_timeout(),
            read_ms: default_timeout(),
        }
    }
}

/// Bucket addressing style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketLookup {
    /// Path style for custom endpoints, virtual hosts otherwise
    #[default]
    Auto,
    Path,
    Dns,
}

/// A named S3-compatible endpoint with credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Endpoint URL
    pub endpoint: String,

    pub access_key: String,

    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Location constraint applied when creating repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_constraint: Option<String>,

    #[serde(default)]
    pub bucket_lookup: BucketLookup,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,

    /// Maximum keys per listing page, backend default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub storage_tiers: StorageTiers,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Profile {
    /// Create a profile with required fields and defaults for the rest
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            location_constraint: None,
            bucket_lookup: BucketLookup::default(),
            timeout: None,
            page_size: None,
            storage_tiers: StorageTiers::default(),
        }
    }

    /// Check the name and endpoint before the profile is saved
    pub fn validate(&self) -> Result<()> {
        if !is_valid_profile_name(&self.name) {
            return Err(Error::Config(format!(
                "invalid profile name '{}': use letters, digits, '_' or '-'",
                self.name
            )));
        }
        let url = Url::parse(&self.endpoint)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.page_size == Some(0) {
            return Err(Error::Config("page_size must be positive".into()));
        }
        Ok(())
    }

    /// Effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }

    /// Blobstore settings derived from this profile
    pub fn blobstore_config(&self) -> BlobstoreConfig {
        BlobstoreConfig {
            location: self.location_constraint.clone(),
            storage_tiers: self.storage_tiers.clone(),
        }
    }
}

pub(crate) fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Profile operations on top of the configuration file
#[derive(Debug, Clone)]
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Manager using the default config location
    pub fn new() -> Result<Self> {
        Ok(Self::with_config_manager(ConfigManager::new()?))
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.config_manager.load()?.profiles)
    }

    pub fn get(&self, name: &str) -> Result<Profile> {
        self.config_manager
            .load()?
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or replace a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        profile.validate()?;
        let mut config = self.config_manager.load()?;
        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);
        self.config_manager.save(&config)
    }

    /// Add a profile, failing if the name is taken
    pub fn add(&self, profile: Profile) -> Result<()> {
        if self.exists(&profile.name)? {
            return Err(Error::ProfileExists(profile.name));
        }
        self.set(profile)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();
        config.profiles.retain(|p| p.name != name);
        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        self.config_manager.save(&config)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.config_manager.load()?.profiles.iter().any(|p| p.name == name))
    }
}
