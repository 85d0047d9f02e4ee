//! rb command - Remove repository
//!
//! Removes an empty repository, or with `--force` its blobs first.

use bs_core::{Result, parse_blob_path};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use super::{open_store, require_repository_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove a repository
#[derive(Args, Debug)]
pub struct RbArgs {
    /// Target path (profile/repository)
    pub target: String,

    /// Delete every blob in the repository before removing it
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RbOutput {
    status: &'static str,
    repository: String,
    deleted_blobs: usize,
}

/// Execute the rb command
pub async fn execute(args: RbArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args, &formatter)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &RbArgs, formatter: &Formatter) -> Result<ExitCode> {
    let path = parse_blob_path(&args.target)?;
    require_repository_path(&path)?;
    let store = open_store(&path.profile).await?;

    let mut deleted_blobs = 0;
    if args.force
        && let Some(repository) = store.get_repository(path.repository()).await?
    {
        for blob in repository.list_all(None).await? {
            if let Some(key) = blob.key().key() {
                debug!(key, "removing blob before repository");
                repository.delete(key).await?;
                deleted_blobs += 1;
            }
        }
    }

    store.delete(path.repository()).await?;

    let output = RbOutput {
        status: "success",
        repository: path.repository().to_string(),
        deleted_blobs,
    };
    formatter.done(&output, |o| match o.deleted_blobs {
        0 => format!("Repository '{}' removed successfully.", args.target),
        n => format!("Repository '{}' and {n} blobs removed successfully.", args.target),
    });
    Ok(ExitCode::Success)
}
