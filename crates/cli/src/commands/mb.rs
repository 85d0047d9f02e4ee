//! mb command - Make repository
//!
//! Creates a repository at the profile's location constraint.

use bs_core::{Error, Result, parse_blob_path};
use clap::Args;
use serde::Serialize;

use super::{open_store, require_repository_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a repository
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Target path (profile/repository)
    pub target: String,

    /// Ignore error if the repository already exists
    #[arg(short = 'p', long)]
    pub ignore_existing: bool,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args, &formatter)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &MbArgs, formatter: &Formatter) -> Result<ExitCode> {
    let path = parse_blob_path(&args.target)?;
    require_repository_path(&path)?;
    let store = open_store(&path.profile).await?;

    let (status, message) = match store.create(path.repository()).await {
        Ok(()) => ("success", None),
        Err(Error::Conflict(reason)) => {
            // A conflict can also be a rejected location; only a present repository is ignorable
            if !args.ignore_existing || !store.exist(path.repository()).await? {
                return Err(Error::Conflict(reason));
            }
            ("exists", Some("Repository already exists".to_string()))
        }
        Err(e) => return Err(e),
    };

    let output = MbOutput {
        status,
        repository: path.repository().to_string(),
        location: store.config().location.clone(),
        message,
    };
    formatter.done(&output, |o| match o.message {
        Some(_) => format!("Repository '{}' already exists.", args.target),
        None => match &o.location {
            Some(location) => format!("Repository '{}' created in {location}.", args.target),
            None => format!("Repository '{}' created successfully.", args.target),
        },
    });
    Ok(ExitCode::Success)
}
