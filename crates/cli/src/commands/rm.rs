//! rm command - Remove blobs
//!
//! Removing a blob that does not exist succeeds.

use bs_core::{Result, parse_blob_path};
use clap::Args;
use serde::Serialize;

use super::open_store;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove blobs
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Blob paths (profile/repository/key)
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
}

/// Execute the rm command
///
/// Every path is attempted; the exit code reflects the last failure.
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let mut exit_code = ExitCode::Success;
    let mut output = RmOutput {
        deleted: Vec::new(),
        failed: Vec::new(),
    };

    for path in &args.paths {
        match remove(path).await {
            Ok(()) => output.deleted.push(path.clone()),
            Err(e) => {
                exit_code = formatter.fail(&e);
                output.failed.push(path.clone());
            }
        }
    }

    formatter.done(&output, |o| {
        o.deleted
            .iter()
            .map(|path| format!("Removed '{path}'."))
            .collect::<Vec<_>>()
            .join("\n")
    });
    exit_code
}

async fn remove(path: &str) -> Result<()> {
    let path = parse_blob_path(path)?;
    path.require_object()?;
    open_store(&path.profile)
        .await?
        .store_agent()
        .delete(&path.key)
        .await
}
