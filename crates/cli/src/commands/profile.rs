//! Profile management commands
//!
//! Profiles are named references to S3-compatible endpoints, including
//! connection details, credentials and repository defaults.

use bs_core::{BucketLookup, Error, Profile, ProfileManager, TimeoutConfig};
use clap::{Subcommand, ValueEnum};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Bucket lookup style accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupArg {
    Auto,
    Path,
    Dns,
}

impl From<LookupArg> for BucketLookup {
    fn from(arg: LookupArg) -> Self {
        match arg {
            LookupArg::Auto => BucketLookup::Auto,
            LookupArg::Path => BucketLookup::Path,
            LookupArg::Dns => BucketLookup::Dns,
        }
    }
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "local", "aws")
    pub name: String,

    /// Endpoint URL (e.g., "http://localhost:9000", "https://s3.amazonaws.com")
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Location constraint for new repositories
    #[arg(long)]
    pub location: Option<String>,

    /// Bucket lookup style
    #[arg(long, value_enum, default_value = "auto")]
    pub bucket_lookup: LookupArg,

    /// Connection timeout in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Maximum blobs per listing page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Storage class for default-priority puts
    #[arg(long)]
    pub default_tier: Option<String>,

    /// Storage class for minimum-priority puts
    #[arg(long)]
    pub min_tier: Option<String>,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for output (without credentials)
#[derive(Debug, Serialize)]
struct ProfileInfo {
    name: String,
    endpoint: String,
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    bucket_lookup: BucketLookup,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            endpoint: profile.endpoint.clone(),
            region: profile.region.clone(),
            location: profile.location_constraint.clone(),
            bucket_lookup: profile.bucket_lookup,
            page_size: profile.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

#[derive(Debug, Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => return formatter.fail(&e),
    };

    let result = match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(&args, &manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(&args, &manager, &formatter),
    };
    result.unwrap_or_else(|e| formatter.fail(&e))
}

fn build_profile(args: SetArgs) -> Profile {
    let mut profile = Profile::new(args.name, args.endpoint, args.access_key, args.secret_key);
    profile.region = args.region;
    profile.location_constraint = args.location;
    profile.bucket_lookup = args.bucket_lookup.into();
    profile.page_size = args.page_size;

    if args.connect_timeout_ms.is_some() || args.read_timeout_ms.is_some() {
        let defaults = TimeoutConfig::default();
        profile.timeout = Some(TimeoutConfig {
            connect_ms: args.connect_timeout_ms.unwrap_or(defaults.connect_ms),
            read_ms: args.read_timeout_ms.unwrap_or(defaults.read_ms),
        });
    }
    if args.default_tier.is_some() {
        profile.storage_tiers.default = args.default_tier;
    }
    if args.min_tier.is_some() {
        profile.storage_tiers.min = args.min_tier;
    }
    profile
}

fn execute_set(
    args: SetArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> Result<ExitCode, Error> {
    let profile = build_profile(args);
    let name = profile.name.clone();
    manager.set(profile)?;

    let output = ProfileOperationOutput {
        success: true,
        message: format!("Profile '{name}' configured successfully."),
        profile: name,
    };
    formatter.done(&output, |o| o.message.clone());
    Ok(ExitCode::Success)
}

fn execute_list(
    args: &ListArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> Result<ExitCode, Error> {
    let profiles = manager.list()?;
    let output = ProfileListOutput {
        profiles: profiles.iter().map(ProfileInfo::from).collect(),
    };
    formatter.record(&output, |_| render_profiles(&profiles, args.long));
    Ok(ExitCode::Success)
}

fn render_profiles(profiles: &[Profile], long: bool) -> String {
    if profiles.is_empty() {
        return "No profiles configured.".to_string();
    }
    if !long {
        return profiles
            .iter()
            .map(|profile| format!("{:<12} {}", profile.name, profile.endpoint))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Name", "Endpoint", "Region", "Location", "Lookup", "Min tier"]);
    for profile in profiles {
        table.add_row(vec![
            profile.name.clone(),
            profile.endpoint.clone(),
            profile.region.clone(),
            profile.location_constraint.clone().unwrap_or_default(),
            format!("{:?}", profile.bucket_lookup).to_lowercase(),
            profile.storage_tiers.min.clone().unwrap_or_default(),
        ]);
    }
    table.to_string()
}

fn execute_remove(
    args: &RemoveArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> Result<ExitCode, Error> {
    manager.remove(&args.name)?;

    let output = ProfileOperationOutput {
        success: true,
        profile: args.name.clone(),
        message: format!("Profile '{}' removed successfully.", args.name),
    };
    formatter.done(&output, |o| o.message.clone());
    Ok(ExitCode::Success)
}
