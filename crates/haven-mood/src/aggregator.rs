use std::collections::BTreeMap;

use crate::models::{MoodEntry, MoodSummary, Rating};

/// Pure statistics over a set of mood entries.
pub struct MoodAggregator;

impl MoodAggregator {
    /// Average is 0 for an empty set; the distribution always carries keys 1 through 5.
    pub fn summarize(entries: &[MoodEntry]) -> MoodSummary {
        let mut distribution: BTreeMap<u8, usize> =
            (Rating::MIN..=Rating::MAX).map(|r| (r, 0)).collect();

        let mut sum: u64 = 0;
        for entry in entries {
            let value = entry.rating.value();
            sum += value as u64;
            *distribution.entry(value).or_insert(0) += 1;
        }

        let total = entries.len();
        let average = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };

        MoodSummary {
            average,
            total,
            distribution,
        }
    }
}
