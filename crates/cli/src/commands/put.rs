//! put command - Store a local file
//!
//! Streams a file into a blob with a content type, user metadata, access
//! control and storage priority.

use std::path::{Path, PathBuf};

use bs_core::{BlobResourceInfo, ByteStream, Result, StorePriority, parse_blob_path};
use bytes::Bytes;
use clap::Args;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use super::open_repository;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, human_size};

const READ_CHUNK: usize = 64 * 1024;

/// Store a local file as a blob
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Destination (profile/repository/key)
    pub target: String,

    /// Content type, guessed from the file name when omitted
    #[arg(long)]
    pub content_type: Option<String>,

    /// Make the blob publicly readable
    #[arg(long)]
    pub public: bool,

    /// Store with minimum priority (cheaper, less durable storage class)
    #[arg(long)]
    pub min_priority: bool,

    /// User metadata entry, may be repeated
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    key: String,
    size_bytes: u64,
    content_type: String,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args, &formatter)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &PutArgs, formatter: &Formatter) -> Result<ExitCode> {
    let path = parse_blob_path(&args.target)?;
    path.require_object()?;

    let file = tokio::fs::File::open(&args.file).await?;
    let size = file.metadata().await?.len();
    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&args.file));

    let repository = open_repository(&path).await?;
    let mut info = BlobResourceInfo::from_stream(
        path.key.clone(),
        content_type.clone(),
        file_stream(file),
        size,
    );
    for (key, value) in &args.meta {
        info.add_metadata(key, value);
    }

    let priority = if args.min_priority {
        StorePriority::Min
    } else {
        StorePriority::Default
    };
    repository.put(&info, args.public, priority).await?;

    let output = PutOutput {
        status: "success",
        key: path.key.to_string(),
        size_bytes: size,
        content_type,
    };
    formatter.done(&output, |o| {
        format!(
            "{} -> {} ({}, {})",
            args.file.display(),
            args.target,
            human_size(o.size_bytes),
            o.content_type
        )
    });
    Ok(ExitCode::Success)
}

fn guess_content_type(file: &Path) -> String {
    mime_guess::from_path(file)
        .first_raw()
        .unwrap_or(bs_core::DEFAULT_MIME_TYPE)
        .to_string()
}

fn file_stream(file: tokio::fs::File) -> ByteStream {
    Box::pin(futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), file)))
    }))
}

fn parse_meta(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
