pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;
use std::io::{self, Write};

/// Dispatch output to the appropriate formatter on stdout.
pub fn format_output(format: &OutputFormat, value: &Value) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => json::print_json(&mut out, value)?,
        OutputFormat::Table => table::print_table(&mut out, value)?,
        OutputFormat::Csv => csv_out::print_csv(&mut out, value)?,
        OutputFormat::Minimal => minimal::print_minimal(&mut out, value)?,
    }
    out.flush()
}
