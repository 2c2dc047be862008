//! Current and longest runs of consecutive active days.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Consecutive-day activity runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streaks {
    /// Length of the run ending at the most recent date
    pub current_streak: u32,

    /// Length of the longest run anywhere in the set
    pub longest_streak: u32,
}

/// Compute the current and longest consecutive-day streaks of a set of dates.
///
/// Two dates belong to the same run when they are at most one calendar day apart.
#[must_use]
pub fn streaks(dates: &BTreeSet<NaiveDate>) -> Streaks {
    let Some(&latest) = dates.last() else {
        return Streaks::default();
    };

    let mut current_streak = 1;
    let mut pointer = latest;
    for &date in dates.iter().rev().skip(1) {
        if (pointer - date).num_days() > 1 {
            break;
        }
        current_streak += 1;
        pointer = date;
    }

    let mut longest_streak = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        run = match previous {
            Some(prev) if (date - prev).num_days() <= 1 => run + 1,
            _ => 1,
        };
        longest_streak = longest_streak.max(run);
        previous = Some(date);
    }

    Streaks {
        current_streak,
        longest_streak,
    }
}
