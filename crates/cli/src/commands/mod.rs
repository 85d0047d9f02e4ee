//! CLI command definitions and execution
//!
//! Each command parses its `profile/repository[/key]` arguments, opens a
//! [`Blobstore`] for the profile and hands its result record or failure to
//! the shared [`Formatter`](crate::output::Formatter).

use std::sync::Arc;

use bs_core::{BlobPath, Blobstore, Error, ProfileManager, Repository, Result};
use bs_s3::S3Backend;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod cat;
mod ls;
mod mb;
mod profile;
mod put;
mod rb;
mod rm;
mod stat;

/// bs - blob storage client
///
/// Stores and retrieves blobs in repositories of S3-compatible services.
#[derive(Parser, Debug)]
#[command(name = "bs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storage profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Create a repository
    Mb(mb::MbArgs),

    /// Remove a repository
    Rb(rb::RbArgs),

    /// List blobs of a repository
    Ls(ls::LsArgs),

    /// Store a local file as a blob
    Put(put::PutArgs),

    /// Write blob contents to stdout
    Cat(cat::CatArgs),

    /// Show blob size, type and metadata
    Stat(stat::StatArgs),

    /// Remove blobs
    Rm(rm::RmArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config).await,
        Commands::Mb(args) => mb::execute(args, output_config).await,
        Commands::Rb(args) => rb::execute(args, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Cat(args) => cat::execute(args, output_config).await,
        Commands::Stat(args) => stat::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
    }
}

/// Blobstore for a configured profile
async fn open_store(profile_name: &str) -> Result<Blobstore> {
    let profile = ProfileManager::new()?.get(profile_name)?;
    let backend = S3Backend::connect(&profile).await?;
    debug!(profile = profile_name, "opened blobstore");
    Ok(Blobstore::new(Arc::new(backend), profile.blobstore_config()))
}

/// Existing repository named by `path`
async fn open_repository(path: &BlobPath) -> Result<Repository> {
    open_store(&path.profile)
        .await?
        .get_repository(path.repository())
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "repository '{}/{}'",
                path.profile,
                path.repository()
            ))
        })
}

/// Reject paths that carry a key where only a repository is expected
fn require_repository_path(path: &BlobPath) -> Result<()> {
    match path.object_key() {
        Some(key) => Err(Error::InvalidPath(format!(
            "expected profile/repository, got a blob key '{key}'"
        ))),
        None => Ok(()),
    }
}
