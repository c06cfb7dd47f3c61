//! Newline-delimited JSON framing for the request loop
//!
//! - Input: one JSON object per line, blank lines ignored
//! - Output: exactly one JSON object per input line, flushed immediately
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// Success envelope
pub fn ok_response(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_response(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Writes one response line and flushes
pub fn write_line<W: Write>(out: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Non-blank request lines of `input`
pub fn request_lines<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<String>> {
    input
        .lines()
        .map(|line| line.map_err(Into::into))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}
