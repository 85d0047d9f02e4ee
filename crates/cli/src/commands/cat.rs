//! cat command - Display blob contents
//!
//! Streams a blob, or a byte range of it, to stdout.

use bs_core::{Error, Result, parse_blob_path};
use clap::Args;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use super::open_repository;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display blob contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Blob path (profile/repository/key)
    pub path: String,

    /// First byte to output
    #[arg(long)]
    pub offset: Option<u64>,

    /// Number of bytes to output, up to the end of the blob when omitted
    #[arg(long)]
    pub length: Option<u64>,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &CatArgs) -> Result<ExitCode> {
    let path = parse_blob_path(&args.path)?;
    let key = path.require_object()?;
    let repository = open_repository(&path).await?;
    let blob = repository.get(key).await?;

    let mut stream = match byte_range(args.offset, args.length, blob.content_length()) {
        Some((start, length)) => blob.content_range(start, length).await?,
        None => blob.content().await?,
    };

    // Binary data goes straight to stdout, not through the formatter
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Transfer(format!("reading {}: {e}", args.path)))?;
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;
    Ok(ExitCode::Success)
}

/// Range to request, `None` for the whole blob
fn byte_range(offset: Option<u64>, length: Option<u64>, size: u64) -> Option<(u64, u64)> {
    match (offset, length) {
        (None, None) => None,
        (offset, length) => {
            let start = offset.unwrap_or(0);
            Some((start, length.unwrap_or_else(|| size.saturating_sub(start))))
        }
    }
}
