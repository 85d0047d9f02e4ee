//! Error types for bs-core
//!
//! Every backend failure is folded into this enum before it reaches a caller,
//! so the CLI can map any failure to an exit code.

use thiserror::Error;

/// Result type alias for bs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for blob storage operations
#[derive(Error, Debug)]
pub enum Error {
    /// The addressed blob or repository does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other backend failure while reading or writing (network, permission, quota)
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Repository creation rejected by the backend (name collision, invalid region)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller broke the API contract (foreign cursor, missing key, consumed stream)
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid remote path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::ContractViolation(_) => 2,                                      // UsageError
            Error::Transfer(_) => 3,                                               // TransferError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5,                   // NotFound
            Error::Conflict(_) | Error::ProfileExists(_) => 6,                     // Conflict
            _ => 1,                                                                // GeneralError
        }
    }

    /// Stable machine-readable name of the variant
    pub const fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Transfer(_) => "transfer",
            Error::Conflict(_) => "conflict",
            Error::ContractViolation(_) => "contract_violation",
            Error::Config(_) => "config",
            Error::InvalidPath(_) => "invalid_path",
            Error::ProfileNotFound(_) => "profile_not_found",
            Error::ProfileExists(_) => "profile_exists",
            Error::Io(_) => "io",
            Error::TomlParse(_) | Error::TomlSerialize(_) => "config",
            Error::InvalidUrl(_) => "invalid_url",
        }
    }

    /// Whether this error means the addressed object is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::ContractViolation("test".into()).exit_code(), 2);
        assert_eq!(Error::Transfer("test".into()).exit_code(), 3);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::ProfileNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::Conflict("test".into()).exit_code(), 6);
        assert_eq!(Error::ProfileExists("test".into()).exit_code(), 6);
        let io = std::io::Error::other("disk");
        assert_eq!(Error::from(io).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::ProfileNotFound("minio".into());
        assert_eq!(err.to_string(), "Profile not found: minio");

        let err = Error::NotFound("photos/cat.jpg".into());
        assert_eq!(err.to_string(), "Not found: photos/cat.jpg");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::NotFound("x".into()).kind(), "not_found");
        assert_eq!(Error::ContractViolation("x".into()).kind(), "contract_violation");
        assert_eq!(Error::ProfileNotFound("x".into()).kind(), "profile_not_found");
        assert_eq!(Error::from(std::io::Error::other("disk")).kind(), "io");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(!Error::Transfer("x".into()).is_not_found());
    }
}
