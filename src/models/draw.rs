//! Draw result data structures.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of drawn-number slots stored per draw.
pub const NUMBER_SLOTS: usize = 6;

/// One results-table row as scraped: trimmed cell texts in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow(pub Vec<String>);

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(cells.into_iter().map(Into::into).collect())
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single lottery result for one game type on one date.
///
/// `(game_type, draw_date)` is the natural key. Games that draw fewer than
/// six numbers leave the trailing slots as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Lottery variant code, e.g. "6/49" or "EZ2"
    pub game_type: String,

    /// Draw calendar date
    pub draw_date: NaiveDate,

    /// Jackpot amount
    pub jackpot: Decimal,

    /// Number of jackpot winners
    pub winners: u32,

    /// Drawn numbers in draw order
    pub numbers: [Option<u32>; NUMBER_SLOTS],
}

impl DrawRecord {
    /// Numbers that are actually present, in slot order.
    pub fn drawn_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.numbers.iter().filter_map(|n| *n)
    }

    /// Dash-joined combination of the present numbers, e.g. `"4-15-23"`.
    pub fn combination(&self) -> String {
        self.drawn_numbers()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Count how often each number appears across the given draws.
pub fn number_frequency<'a, I>(records: I) -> BTreeMap<u32, u64>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut heatmap = BTreeMap::new();
    for record in records {
        for number in record.drawn_numbers() {
            *heatmap.entry(number).or_insert(0) += 1;
        }
    }
    heatmap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(numbers: [Option<u32>; NUMBER_SLOTS]) -> DrawRecord {
        DrawRecord {
            game_type: "6/49".to_string(),
            draw_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            jackpot: Decimal::new(100_000_000, 2),
            winners: 0,
            numbers,
        }
    }

    #[test]
    fn combination_skips_absent_slots() {
        let r = record([Some(1), None, Some(3), None, None, None]);
        assert_eq!(r.combination(), "1-3");
        assert_eq!(r.drawn_numbers().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn frequency_counts_each_number_across_draws() {
        let a = record([Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)]);
        let b = record([Some(6), Some(5), Some(4), Some(3), Some(2), Some(1)]);

        let heatmap = number_frequency([&a, &b]);

        assert_eq!(heatmap.len(), 6);
        assert!((1..=6).all(|n| heatmap[&n] == 2));
    }

    #[test]
    fn frequency_ignores_absent_slots() {
        let ez2 = record([Some(7), Some(7), None, None, None, None]);
        let heatmap = number_frequency([&ez2]);
        assert_eq!(heatmap.get(&7), Some(&2));
        assert_eq!(heatmap.len(), 1);
    }
}
