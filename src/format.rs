use std::cmp::Ordering;
use std::fmt;

use crate::aggregate::{PartialAggregate, Stats};

/// Final per-key figures, still in tenths. `mean` is computed exactly
/// once, from the fully merged `(sum, count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalStats {
    pub min: i64,
    pub mean: i64,
    pub max: i64,
}

impl FinalStats {
    fn from_merged(stats: Stats) -> Self {
        Self {
            min: stats.min,
            mean: mean_tenths(stats.sum, stats.count),
            max: stats.max,
        }
    }
}

/// Converts the completed merge state into the final per-key figures,
/// sorted by key bytes ascending.
pub fn finalize(merged: PartialAggregate) -> Vec<(Box<str>, FinalStats)> {
    let mut entries: Vec<(Box<str>, FinalStats)> = merged
        .into_iter()
        .map(|(key, stats)| (key, FinalStats::from_merged(stats)))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Renders the sorted entries as `key: min/mean/max` lines, one
/// fractional digit each.
pub fn render(entries: &[(Box<str>, FinalStats)]) -> Vec<String> {
    entries
        .iter()
        .map(|(key, stats)| {
            format!(
                "{key}: {}/{}/{}",
                Tenths(stats.min),
                Tenths(stats.mean),
                Tenths(stats.max)
            )
        })
        .collect()
}

/// `sum / count` rounded to the nearest tenth, ties to even, in integer
/// arithmetic. `count` comes from a merged entry and is never zero.
fn mean_tenths(sum: i64, count: u64) -> i64 {
    let count = count as i64;
    let quotient = sum.div_euclid(count);
    let remainder = sum.rem_euclid(count);
    match (2 * remainder).cmp(&count) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

/// Displays a tenths value with exactly one fractional digit.
struct Tenths(i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}
