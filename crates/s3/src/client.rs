//! S3 backend implementation
//!
//! Wraps aws-sdk-s3 and implements the StorageBackend trait from bs-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_smithy_types::timeout::TimeoutConfig;
use bs_core::{
    BackendKind, BucketLookup, ByteRange, ByteStream, DEFAULT_MIME_TYPE, Error, ListCursor,
    Metadata, ObjectHead, ObjectListing, ObjectSummary, Profile, PutObjectRequest,
    Result, StorageBackend,
};
use jiff::Timestamp;
use tracing::debug;

use crate::error::map_sdk_error;
use crate::upload::put_streamed;

/// S3-compatible storage backend
#[derive(Clone)]
pub struct S3Backend {
    inner: Client,
    page_size: Option<i32>,
}

impl S3Backend {
    /// Connect using a profile's endpoint, credentials and timeouts
    pub async fn connect(profile: &Profile) -> Result<Self> {
        profile.validate()?;

        let credentials = Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
            None,
            None,
            "bs-static-credentials",
        );

        let timeouts = profile.timeout_config();
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .read_timeout(Duration::from_millis(timeouts.read_ms))
            .build();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(profile.region.clone()))
            .endpoint_url(&profile.endpoint)
            .timeout_config(timeout_config)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.bucket_lookup != BucketLookup::Dns)
            .build();

        debug!(profile = %profile.name, endpoint = %profile.endpoint, "connected S3 backend");
        Ok(Self::from_client(
            Client::from_conf(s3_config),
            profile.page_size,
        ))
    }

    /// Backend over an already configured client
    pub fn from_client(client: Client, page_size: Option<u32>) -> Self {
        Self {
            inner: client,
            page_size: page_size.map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ObjectListing> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }
        if let Some(max) = self.page_size {
            request = request.max_keys(max);
        }
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        let summaries = response
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().map_or(0, clamp_size),
                last_modified: to_timestamp(object.last_modified()),
            })
            .collect();

        let truncated = response.is_truncated().unwrap_or(false);
        Ok(ObjectListing {
            repository: bucket.to_string(),
            summaries,
            cursor: next_cursor(
                bucket,
                prefix,
                truncated,
                response.next_continuation_token(),
            ),
            truncated,
        })
    }
}

/// Cursor for the page after a listing response, if there is one
fn next_cursor(
    bucket: &str,
    prefix: Option<&str>,
    truncated: bool,
    token: Option<&str>,
) -> Option<ListCursor> {
    match token {
        Some(token) if truncated => Some(ListCursor::S3 {
            bucket: bucket.to_string(),
            prefix: prefix.map(str::to_string),
            continuation_token: token.to_string(),
        }),
        _ => None,
    }
}

fn to_timestamp(value: Option<&DateTime>) -> Timestamp {
    value
        .and_then(|dt| Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok())
        .unwrap_or(Timestamp::UNIX_EPOCH)
}

fn clamp_size(size: i64) -> u64 {
    u64::try_from(size).unwrap_or(0)
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectHead> {
        let subject = format!("{repository}/{key}");
        let response = self
            .inner
            .head_object()
            .bucket(repository)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &subject))?;

        let user_metadata: Metadata = response
            .metadata()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Ok(ObjectHead {
            size: response.content_length().map_or(0, clamp_size),
            mime_type: response
                .content_type()
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string(),
            last_modified: to_timestamp(response.last_modified()),
            user_metadata,
        })
    }

    async fn get_object(
        &self,
        repository: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ByteStream> {
        let subject = format!("{repository}/{key}");
        let mut request = self.inner.get_object().bucket(repository).key(key);
        if let Some(range) = range {
            request = request.range(range.to_header());
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &subject))?;

        let stream = futures::stream::unfold(response.body, |mut body| async move {
            body.next()
                .await
                .map(|chunk| (chunk.map_err(std::io::Error::other), body))
        });
        Ok(Box::pin(stream))
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        put_streamed(&self.inner, request).await
    }

    async fn delete_object(&self, repository: &str, key: &str) -> Result<()> {
        let subject = format!("{repository}/{key}");
        self.inner
            .delete_object()
            .bucket(repository)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &subject))?;
        Ok(())
    }

    async fn list_objects(&self, repository: &str, prefix: &str) -> Result<ObjectListing> {
        let prefix = Some(prefix).filter(|p| !p.is_empty());
        self.list_page(repository, prefix, None).await
    }

    async fn list_objects_next(&self, cursor: &ListCursor) -> Result<ObjectListing> {
        match cursor {
            ListCursor::S3 {
                bucket,
                prefix,
                continuation_token,
            } => {
                self.list_page(bucket, prefix.as_deref(), Some(continuation_token))
                    .await
            }
            other => Err(Error::ContractViolation(format!(
                "{} cursor passed to the s3 backend",
                other.backend()
            ))),
        }
    }

    async fn bucket_exists(&self, repository: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(repository).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, repository) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, repository: &str, location: Option<String>) -> Result<()> {
        let mut request = self.inner.create_bucket().bucket(repository);
        if let Some(location) = location {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(location.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, repository))?;
        Ok(())
    }

    async fn delete_bucket(&self, repository: &str) -> Result<()> {
        self.inner
            .delete_bucket()
            .bucket(repository)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, repository))?;
        Ok(())
    }
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
