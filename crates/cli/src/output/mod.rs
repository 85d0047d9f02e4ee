//! Output formatting utilities
//!
//! Record rendering for human-readable and JSON output, and size/time helpers
//! shared by the commands.

mod render;

pub use render::Formatter;

use jiff::Timestamp;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

/// Binary-prefixed size, e.g. `1.50 KiB`
pub fn human_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Timestamp as shown in listings
pub fn display_time(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%d %H:%M:%S").to_string()
}
