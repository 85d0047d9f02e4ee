//! Mapping of SDK failures onto bs-core errors

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use bs_core::Error;

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];

const CONFLICT_CODES: &[&str] = &[
    "BucketAlreadyExists",
    "BucketAlreadyOwnedByYou",
    "InvalidLocationConstraint",
    "IllegalLocationConstraintException",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    NotFound,
    Conflict,
    Transfer,
}

fn classify(code: Option<&str>, status: Option<u16>) -> Class {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => Class::NotFound,
        Some(code) if CONFLICT_CODES.contains(&code) => Class::Conflict,
        // HEAD responses carry no body, so only the status is left
        _ if status == Some(404) => Class::NotFound,
        _ => Class::Transfer,
    }
}

/// Fold an SDK error into the core error enum
///
/// `subject` names what was addressed, e.g. `bucket/key`.
pub(crate) fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code());
    let status = err.raw_response().map(|r| r.status().as_u16());
    match classify(code, status) {
        Class::NotFound => Error::NotFound(subject.to_string()),
        Class::Conflict => Error::Conflict(format!(
            "{subject}: {}",
            code.unwrap_or("rejected by server")
        )),
        Class::Transfer => Error::Transfer(format!("{subject}: {}", DisplayErrorContext(&err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes() {
        for code in ["NoSuchKey", "NoSuchBucket", "NotFound"] {
            assert_eq!(classify(Some(code), Some(404)), Class::NotFound);
        }
    }

    #[test]
    fn test_bare_404_is_not_found() {
        assert_eq!(classify(None, Some(404)), Class::NotFound);
    }

    #[test]
    fn test_create_conflicts() {
        assert_eq!(classify(Some("BucketAlreadyExists"), Some(409)), Class::Conflict);
        assert_eq!(classify(Some("BucketAlreadyOwnedByYou"), Some(409)), Class::Conflict);
        assert_eq!(
            classify(Some("InvalidLocationConstraint"), Some(400)),
            Class::Conflict
        );
    }

    #[test]
    fn test_everything_else_is_transfer() {
        assert_eq!(classify(Some("AccessDenied"), Some(403)), Class::Transfer);
        assert_eq!(classify(Some("BucketNotEmpty"), Some(409)), Class::Transfer);
        assert_eq!(classify(Some("InvalidRange"), Some(416)), Class::Transfer);
        assert_eq!(classify(None, None), Class::Transfer);
    }
}
