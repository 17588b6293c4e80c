//! Shared output helpers.

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::OutputFormat;

/// Print a serializable result as pretty JSON.
///
/// Text output is written by each command itself.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Json = format {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: failed to serialize output: {}", "Error".red().bold(), e),
        }
    }
}

/// Count coloured green when zero and yellow otherwise.
pub fn count(n: usize) -> ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().yellow().bold()
    }
}

/// Comma-separated indices, truncated after `limit` entries.
pub fn index_list(indices: &[u32], limit: usize) -> String {
    let mut text = indices
        .iter()
        .take(limit)
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if indices.len() > limit {
        text.push_str(&format!(", ... ({} more)", indices.len() - limit));
    }
    text
}
