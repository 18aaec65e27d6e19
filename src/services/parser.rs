// src/services/parser.rs

//! Raw table row to [`DrawRecord`] conversion.
//!
//! Column order is fixed: game type, combination, draw date, jackpot,
//! winners. Cells past the fifth are ignored.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ParseError;
use crate::models::{DrawRecord, NUMBER_SLOTS, RawRow};
use crate::utils::parse_draw_date;

const FIELD_COUNT: usize = 5;

/// Parse one raw row into a validated draw record.
pub fn parse(raw: &RawRow) -> Result<DrawRecord, ParseError> {
    let cells = raw.cells();
    if cells.len() < FIELD_COUNT {
        return Err(ParseError::MalformedRow(format!(
            "expected {FIELD_COUNT} fields, found {}",
            cells.len()
        )));
    }

    let game_type = cells[0].trim();
    if game_type.is_empty() {
        return Err(ParseError::MalformedRow("empty game type".into()));
    }

    let draw_date =
        parse_draw_date(&cells[2]).ok_or_else(|| ParseError::InvalidDate(cells[2].clone()))?;
    let jackpot = parse_jackpot(&cells[3])?;
    let winners = cells[4]
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidWinners(cells[4].clone()))?;

    Ok(DrawRecord {
        game_type: game_type.to_string(),
        draw_date,
        jackpot,
        winners,
        numbers: parse_combination(game_type, &cells[1]),
    })
}

/// Parse every row, keeping the valid records and logging the rejects.
pub fn parse_all<'a>(rows: impl IntoIterator<Item = &'a RawRow>) -> (Vec<DrawRecord>, usize) {
    let mut records = Vec::new();
    let mut rejected = 0;
    for row in rows {
        match parse(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                log::warn!("Rejected row {:?}: {}", row.cells(), e);
            }
        }
    }
    (records, rejected)
}

fn parse_jackpot(s: &str) -> Result<Decimal, ParseError> {
    let cleaned = s.trim().replace(',', "");
    match Decimal::from_str(&cleaned) {
        Ok(value) if !value.is_sign_negative() => Ok(value),
        _ => Err(ParseError::InvalidJackpot(s.to_string())),
    }
}

fn parse_combination(game_type: &str, s: &str) -> [Option<u32>; NUMBER_SLOTS] {
    let mut numbers = [None; NUMBER_SLOTS];
    for (slot, part) in s.split('-').take(NUMBER_SLOTS).enumerate() {
        let part = part.trim();
        match part.parse::<u32>() {
            Ok(n) => numbers[slot] = Some(n),
            Err(_) => {
                log::warn!("{game_type}: dropping non-numeric slot {slot} '{part}' in '{s}'")
            }
        }
    }
    numbers
}
