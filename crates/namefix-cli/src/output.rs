//! Terminal output for namefix commands
//!
//! Human mode prints one line per message and marks plan items with a glyph
//! for their status. JSON mode prints exactly one document per command on
//! stdout; errors and warnings go to stderr as one JSON object per line.

use namefix_core::domain::Status;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// One plan item, marked with its status
    fn item(&self, status: Status, message: &str);
    /// The command's result document
    fn document(&self, value: &Value);
}

/// Glyph shown in front of an item with `status`
pub fn status_glyph(status: Status) -> char {
    match status {
        Status::Pending => '\u{00b7}',
        Status::InProgress => '\u{2026}',
        Status::Completed => '\u{2713}',
        Status::Failed => '\u{2717}',
    }
}

fn item_line(status: Status, message: &str) -> String {
    format!("  {} {:<12} {message}", status_glyph(status), status.to_string())
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn item(&self, status: Status, message: &str) {
        println!("{}", item_line(status, message));
    }
    fn document(&self, _value: &Value) {}
}

fn diagnostic(level: &str, message: &str) -> Value {
    json!({ "level": level, "message": message })
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", diagnostic("error", message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", diagnostic("warning", message));
    }
    fn info(&self, _message: &str) {}
    // Items are part of the document
    fn item(&self, _status: Status, _message: &str) {}
    fn document(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("{}", diagnostic("error", &e.to_string())),
        }
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// `"1 conflict"` / `"3 conflicts"`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
