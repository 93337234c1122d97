use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print JSON.
pub fn print_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
