// src/utils/date.rs

//! Draw date parsing.

use chrono::NaiveDate;

/// Accepted source formats, tried in order; the first match wins.
pub const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%-m/%-d/%Y", "%Y-%m-%d"];

/// Parse a draw date in any accepted format.
pub fn parse_draw_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_comes_before_day() {
        assert_eq!(parse_draw_date("01/02/2006"), Some(ymd(2006, 1, 2)));
    }

    #[test]
    fn test_accepted_formats() {
        assert_eq!(parse_draw_date("1/2/2006"), Some(ymd(2006, 1, 2)));
        assert_eq!(parse_draw_date("12/31/2023"), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_draw_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_draw_date(" 2024-01-05 "), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_rejects_unknown_formats() {
        assert_eq!(parse_draw_date("invalid"), None);
        assert_eq!(parse_draw_date("31/12/2023"), None);
        assert_eq!(parse_draw_date("2024.01.05"), None);
        assert_eq!(parse_draw_date(""), None);
    }
}
