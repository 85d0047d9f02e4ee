//! Streamed uploads
//!
//! Content is consumed one part at a time. A body that ends within the first
//! part is sent with a single PutObject; longer bodies become a multipart
//! upload, so memory use stays bounded by the part size. A failed multipart
//! upload is aborted before the error is returned.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl, StorageClass};
use bs_core::{ByteStream, Error, Metadata, ObjectAcl, PutObjectRequest, Result};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::map_sdk_error;

/// Part size for multipart uploads: 8 MiB
pub const PART_SIZE: usize = 8 * 1024 * 1024;

/// Minimum part size accepted by S3 for every part but the last: 5 MiB
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Accumulates stream chunks into parts of a fixed size
#[derive(Debug)]
pub(crate) struct PartBuffer {
    part_size: usize,
    pending: BytesMut,
}

impl PartBuffer {
    pub(crate) fn new(part_size: usize) -> Self {
        Self {
            part_size: part_size.max(1),
            pending: BytesMut::new(),
        }
    }

    /// Add a chunk and take every part it completes
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(chunk);
        let mut parts = Vec::new();
        while self.pending.len() >= self.part_size {
            parts.push(self.pending.split_to(self.part_size).freeze());
        }
        parts
    }

    /// Remaining bytes, shorter than one part
    pub(crate) fn finish(self) -> Bytes {
        self.pending.freeze()
    }
}

/// Destination and stored attributes of an upload
struct Target {
    bucket: String,
    key: String,
    mime_type: String,
    metadata: Metadata,
    acl: ObjectAcl,
    storage_class: Option<String>,
    declared: u64,
}

impl Target {
    fn subject(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }

    fn check_length(&self, received: u64) -> Result<()> {
        if received == self.declared {
            Ok(())
        } else {
            Err(Error::Transfer(format!(
                "declared {} bytes for {} but received {received}",
                self.declared,
                self.subject()
            )))
        }
    }

    fn canned_acl(&self) -> Option<ObjectCannedAcl> {
        (self.acl == ObjectAcl::PublicRead).then_some(ObjectCannedAcl::PublicRead)
    }
}

/// Upload `request`, choosing single or multipart by the streamed size
pub(crate) async fn put_streamed(client: &Client, request: PutObjectRequest) -> Result<()> {
    let PutObjectRequest {
        repository,
        key,
        body,
        content_length,
        mime_type,
        metadata,
        acl,
        storage_class,
    } = request;
    let target = Target {
        bucket: repository,
        key,
        mime_type,
        metadata,
        acl,
        storage_class,
        declared: content_length,
    };
    Uploader {
        client,
        target,
        body,
        buffer: PartBuffer::new(PART_SIZE),
        received: 0,
    }
    .run()
    .await
}

struct Uploader<'a> {
    client: &'a Client,
    target: Target,
    body: ByteStream,
    buffer: PartBuffer,
    received: u64,
}

impl Uploader<'_> {
    async fn run(mut self) -> Result<()> {
        let first = loop {
            match self.next_parts().await? {
                Some(parts) if !parts.is_empty() => break parts,
                Some(_) => continue,
                None => {
                    self.target.check_length(self.received)?;
                    let data = self.buffer.finish();
                    return put_single(self.client, &self.target, data).await;
                }
            }
        };

        let upload_id = create_upload(self.client, &self.target).await?;
        debug!(key = %self.target.subject(), %upload_id, "started multipart upload");
        match self.upload_parts(&upload_id, first).await {
            Ok(parts) => complete_upload(self.client, &self.target, &upload_id, parts).await,
            Err(e) => {
                abort_upload(self.client, &self.target, &upload_id).await;
                Err(e)
            }
        }
    }

    /// Parts completed by the next chunk, `None` at the end of the body
    async fn next_parts(&mut self) -> Result<Option<Vec<Bytes>>> {
        match self.body.next().await {
            Some(Ok(chunk)) => {
                self.received += chunk.len() as u64;
                Ok(Some(self.buffer.push(&chunk)))
            }
            Some(Err(e)) => Err(Error::Transfer(format!(
                "reading content for {}: {e}",
                self.target.subject()
            ))),
            None => Ok(None),
        }
    }

    async fn upload_parts(&mut self, upload_id: &str, first: Vec<Bytes>) -> Result<Vec<CompletedPart>> {
        let mut completed = Vec::new();
        let mut ready = first;
        loop {
            for data in ready.drain(..) {
                let number = completed.len() as i32 + 1;
                completed.push(upload_part(self.client, &self.target, upload_id, number, data).await?);
            }
            match self.next_parts().await? {
                Some(parts) => ready = parts,
                None => break,
            }
        }

        self.target.check_length(self.received)?;
        let tail = std::mem::replace(&mut self.buffer, PartBuffer::new(PART_SIZE)).finish();
        if !tail.is_empty() {
            let number = completed.len() as i32 + 1;
            completed.push(upload_part(self.client, &self.target, upload_id, number, tail).await?);
        }
        Ok(completed)
    }
}

async fn put_single(client: &Client, target: &Target, data: Bytes) -> Result<()> {
    let subject = target.subject();
    let put = client
        .put_object()
        .bucket(&target.bucket)
        .key(&target.key)
        .content_length(data.len() as i64)
        .content_type(&target.mime_type)
        .set_metadata(Some(target.metadata.clone().into_iter().collect()))
        .set_acl(target.canned_acl())
        .set_storage_class(target.storage_class.as_deref().map(StorageClass::from))
        .body(AwsByteStream::from(data));

    put.send().await.map_err(|e| map_sdk_error(e, &subject))?;
    debug!(key = %subject, "stored object");
    Ok(())
}

async fn create_upload(client: &Client, target: &Target) -> Result<String> {
    let subject = target.subject();
    let output = client
        .create_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .content_type(&target.mime_type)
        .set_metadata(Some(target.metadata.clone().into_iter().collect()))
        .set_acl(target.canned_acl())
        .set_storage_class(target.storage_class.as_deref().map(StorageClass::from))
        .send()
        .await
        .map_err(|e| map_sdk_error(e, &subject))?;

    output
        .upload_id()
        .map(str::to_string)
        .ok_or_else(|| Error::Transfer(format!("no upload id returned for {subject}")))
}

async fn upload_part(
    client: &Client,
    target: &Target,
    upload_id: &str,
    number: i32,
    data: Bytes,
) -> Result<CompletedPart> {
    let subject = target.subject();
    let size = data.len();
    let output = client
        .upload_part()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .part_number(number)
        .content_length(size as i64)
        .body(AwsByteStream::from(data))
        .send()
        .await
        .map_err(|e| map_sdk_error(e, &subject))?;

    debug!(key = %subject, part = number, size, "uploaded part");
    Ok(CompletedPart::builder()
        .set_e_tag(output.e_tag().map(str::to_string))
        .part_number(number)
        .build())
}

async fn complete_upload(
    client: &Client,
    target: &Target,
    upload_id: &str,
    parts: Vec<CompletedPart>,
) -> Result<()> {
    let subject = target.subject();
    let count = parts.len();
    let upload = CompletedMultipartUpload::builder()
        .set_parts(Some(parts))
        .build();
    let result = client
        .complete_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .multipart_upload(upload)
        .send()
        .await;

    match result {
        Ok(_) => {
            debug!(key = %subject, parts = count, "stored object");
            Ok(())
        }
        Err(e) => {
            abort_upload(client, target, upload_id).await;
            Err(map_sdk_error(e, &subject))
        }
    }
}

/// Best effort; a leftover upload is reported and otherwise ignored
async fn abort_upload(client: &Client, target: &Target, upload_id: &str) {
    let result = client
        .abort_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .send()
        .await;
    if let Err(e) = result {
        warn!(key = %target.subject(), %upload_id, error = %e, "failed to abort multipart upload");
    }
}
