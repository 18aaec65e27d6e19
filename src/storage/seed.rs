// src/storage/seed.rs

//! Bulk seed file reader.
//!
//! The export is `#`-delimited with no header row. Fields may be
//! double-quoted to carry a literal `#`, and `""` inside quotes is an
//! escaped quote.

use std::fs;
use std::mem::take;
use std::path::Path;

use crate::error::Result;
use crate::models::{DrawRecord, RawRow};
use crate::services::parser;
use crate::utils::clean_text;

/// Field separator of the export format.
pub const SEED_DELIMITER: char = '#';

/// Split delimited text into rows of whitespace-collapsed fields, the same
/// cleanup scraped cells get. Blank lines are dropped.
pub fn parse_rows(text: &str, sep: char) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Unterminated quotes still flush whatever was read.
    row.push(field);
    push_row(&mut rows, row);
    rows
}

fn push_row(rows: &mut Vec<RawRow>, row: Vec<String>) {
    let blank = row.iter().all(|f| f.trim().is_empty());
    if !blank {
        rows.push(RawRow::new(row.iter().map(|f| clean_text([f.as_str()]))));
    }
}

/// Read the seed file into raw rows.
pub fn load_seed_rows(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_rows(&text, SEED_DELIMITER))
}

/// Read and parse the seed file. Returns the valid records and the number
/// of rejected rows.
pub fn load_seed_records(path: impl AsRef<Path>) -> Result<(Vec<DrawRecord>, usize)> {
    let path = path.as_ref();
    let rows = load_seed_rows(path)?;
    let (records, rejected) = parser::parse_all(&rows);
    log::info!(
        "Seed file {}: {} rows, {} valid, {} rejected",
        path.display(),
        rows.len(),
        records.len(),
        rejected
    );
    Ok((records, rejected))
}
