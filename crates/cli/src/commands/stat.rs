//! stat command - Show blob metadata
//!
//! Displays size, content type, modification time and user metadata.

use bs_core::{BlobResourceInfo, Metadata, Result, parse_blob_path};
use clap::Args;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;

use super::open_repository;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, display_time, human_size};

/// Show blob metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Blob path (profile/repository/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    repository: String,
    key: String,
    size_bytes: u64,
    size_human: String,
    content_type: String,
    last_modified: String,
    metadata: Metadata,
}

impl StatOutput {
    async fn of(info: &BlobResourceInfo) -> Result<Self> {
        Ok(Self {
            repository: info.key().repository().to_string(),
            key: info.key().key().unwrap_or_default().to_string(),
            size_bytes: info.content_length(),
            size_human: human_size(info.content_length()),
            content_type: info.mime_type().await?.to_string(),
            last_modified: info.last_modified().to_string(),
            metadata: info.metadata().await?.clone(),
        })
    }

    fn table(&self, info: &BlobResourceInfo) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec!["Name".to_string(), format!("{}/{}", self.repository, self.key)]);
        table.add_row(vec![
            "Size".to_string(),
            format!("{} ({} bytes)", self.size_human, self.size_bytes),
        ]);
        table.add_row(vec!["Type".to_string(), self.content_type.clone()]);
        table.add_row(vec![
            "Modified".to_string(),
            format!("{} UTC", display_time(info.last_modified())),
        ]);
        for (key, value) in &self.metadata {
            table.add_row(vec![format!("Meta {key}"), value.clone()]);
        }
        table
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    run(&args, &formatter)
        .await
        .unwrap_or_else(|e| formatter.fail(&e))
}

async fn run(args: &StatArgs, formatter: &Formatter) -> Result<ExitCode> {
    let path = parse_blob_path(&args.path)?;
    let key = path.require_object()?;
    let repository = open_repository(&path).await?;
    let info = repository.get(key).await?;
    let output = StatOutput::of(&info).await?;

    formatter.record(&output, |o| o.table(&info).to_string());
    Ok(ExitCode::Success)
}
