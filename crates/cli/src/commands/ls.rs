//! ls command - List blobs
//!
//! Walks every page of a repository listing, optionally restricted to a key
//! prefix.

use bs_core::{BlobResourceInfo, Result, parse_blob_path};
use clap::Args;
use serde::Serialize;

use super::open_repository;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, display_time, human_size};

/// List blobs
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Repository path with optional key prefix (profile/repository[/prefix])
    pub path: String,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsEntry {
    key: String,
    size_bytes: u64,
    size_human: String,
    last_modified: String,
}

impl From<&BlobResourceInfo> for LsEntry {
    fn from(info: &BlobResourceInfo) -> Self {
        Self {
            key: info.key().key().unwrap_or_default().to_string(),
            size_bytes: info.content_length(),
            size_human: human_size(info.content_length()),
            last_modified: info.last_modified().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<LsEntry>,
    pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_blobs: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

impl Summary {
    fn of(items: &[BlobResourceInfo]) -> Self {
        let total_size_bytes = items.iter().map(BlobResourceInfo::content_length).sum();
        Self {
            total_blobs: items.len(),
            total_size_bytes,
            total_size_human: human_size(total_size_bytes),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args, &formatter)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &LsArgs, formatter: &Formatter) -> Result<ExitCode> {
    let path = parse_blob_path(&args.path)?;
    let repository = open_repository(&path).await?;

    let mut page = repository.list(path.object_key()).await?;
    let mut pages = 1;
    let mut items = Vec::new();
    while page.has_more() {
        let next = repository.list_next(&page).await?;
        items.extend(page);
        page = next;
        pages += 1;
    }
    items.extend(page);

    let output = LsOutput {
        items: items.iter().map(LsEntry::from).collect(),
        pages,
        summary: args.summarize.then(|| Summary::of(&items)),
    };
    formatter.record(&output, |o| render_listing(&items, o.summary.as_ref()));
    Ok(ExitCode::Success)
}

fn render_listing(items: &[BlobResourceInfo], summary: Option<&Summary>) -> String {
    let mut lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "[{}] {:>10} {}",
                display_time(item.last_modified()),
                human_size(item.content_length()),
                item.key().key().unwrap_or_default()
            )
        })
        .collect();
    if let Some(summary) = summary {
        lines.push(format!(
            "\nTotal: {} blobs, {}",
            summary.total_blobs, summary.total_size_human
        ));
    }
    lines.join("\n")
}
