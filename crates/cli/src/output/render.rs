//! Command result rendering
//!
//! Commands hand over a serializable record. In JSON mode the record is the
//! output; otherwise the command's human rendering is printed. Failures go to
//! stderr and carry their error kind and exit code in JSON mode.

use bs_core::Error;
use serde::Serialize;
use serde_json::{Value, json};

use super::OutputConfig;
use crate::exit_code::ExitCode;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Renders command records and failures for one invocation
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    fn colored(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Print `record`, rendered by `human` outside JSON mode
    pub fn record<T: Serialize>(&self, record: &T, human: impl FnOnce(&T) -> String) {
        if self.config.json {
            print_json(record);
        } else if !self.config.quiet {
            println!("{}", human(record));
        }
    }

    /// Like [`record`](Self::record), with every human line marked as done
    pub fn done<T: Serialize>(&self, record: &T, human: impl FnOnce(&T) -> String) {
        if self.config.json {
            print_json(record);
        } else if !self.config.quiet {
            for line in human(record).lines() {
                println!("{}", self.mark('✓', GREEN, line));
            }
        }
    }

    /// Report a failed command and pick its exit code
    ///
    /// Printed even in quiet mode.
    pub fn fail(&self, err: &Error) -> ExitCode {
        let code = ExitCode::from(err);
        if self.config.json {
            let document = failure_document(err, code);
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&document).unwrap_or_else(|_| err.to_string())
            );
        } else {
            eprintln!("{}", self.mark('✗', RED, &err.to_string()));
        }
        code
    }

    fn mark(&self, symbol: char, color: &str, line: &str) -> String {
        if self.colored() {
            format!("{color}{symbol}{RESET} {line}")
        } else {
            format!("{symbol} {line}")
        }
    }
}

fn print_json<T: Serialize>(record: &T) {
    match serde_json::to_string_pretty(record) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("cannot serialize command output: {e}"),
    }
}

/// `{"error": {kind, message, exit_code}}` written to stderr in JSON mode
fn failure_document(err: &Error, code: ExitCode) -> Value {
    json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
            "exit_code": code.as_i32(),
        }
    })
}
