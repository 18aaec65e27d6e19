//! Utility functions and helpers.

pub mod date;
pub mod http;

pub use date::parse_draw_date;

/// Trimmed, whitespace-collapsed text of a cell.
pub fn clean_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
