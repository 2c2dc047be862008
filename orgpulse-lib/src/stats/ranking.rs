//! Cross-contributor ranking.
//!
//! For every [`Metric`], contributors are ordered by value, highest first,
//! and receive their 1-based position as rank. Ties keep the alphabetical
//! username order, so identical input always ranks identically.

use super::record::{Category, ContributionRecord, Contributions};
use super::reference_time::Window;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// A rankable quantity of a contribution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    Pr,
    Issue,
    Commit,
    PrDaily,
    PrWeekly,
    PrMonthly,
    PrAllTime,
    IssueDaily,
    IssueWeekly,
    IssueMonthly,
    IssueAllTime,
    CommitDaily,
    CommitWeekly,
    CommitMonthly,
    CommitAllTime,
}

impl Metric {
    /// The bucket metric of `category` for `window`
    #[must_use]
    pub const fn windowed(category: Category, window: Window) -> Self {
        match (category, window) {
            (Category::PullRequests, Window::Daily) => Self::PrDaily,
            (Category::PullRequests, Window::Weekly) => Self::PrWeekly,
            (Category::PullRequests, Window::Monthly) => Self::PrMonthly,
            (Category::PullRequests, Window::AllTime) => Self::PrAllTime,
            (Category::Issues, Window::Daily) => Self::IssueDaily,
            (Category::Issues, Window::Weekly) => Self::IssueWeekly,
            (Category::Issues, Window::Monthly) => Self::IssueMonthly,
            (Category::Issues, Window::AllTime) => Self::IssueAllTime,
            (Category::Commits, Window::Daily) => Self::CommitDaily,
            (Category::Commits, Window::Weekly) => Self::CommitWeekly,
            (Category::Commits, Window::Monthly) => Self::CommitMonthly,
            (Category::Commits, Window::AllTime) => Self::CommitAllTime,
        }
    }

    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Pr | Self::PrDaily | Self::PrWeekly | Self::PrMonthly | Self::PrAllTime => Category::PullRequests,
            Self::Issue | Self::IssueDaily | Self::IssueWeekly | Self::IssueMonthly | Self::IssueAllTime => Category::Issues,
            Self::Commit | Self::CommitDaily | Self::CommitWeekly | Self::CommitMonthly | Self::CommitAllTime => Category::Commits,
        }
    }

    /// The window bucket this metric reads, or `None` for the raw count
    #[must_use]
    pub const fn window(self) -> Option<Window> {
        match self {
            Self::Pr | Self::Issue | Self::Commit => None,
            Self::PrDaily | Self::IssueDaily | Self::CommitDaily => Some(Window::Daily),
            Self::PrWeekly | Self::IssueWeekly | Self::CommitWeekly => Some(Window::Weekly),
            Self::PrMonthly | Self::IssueMonthly | Self::CommitMonthly => Some(Window::Monthly),
            Self::PrAllTime | Self::IssueAllTime | Self::CommitAllTime => Some(Window::AllTime),
        }
    }

    #[must_use]
    pub fn value(self, record: &ContributionRecord) -> u64 {
        let category = self.category();
        match self.window() {
            None => record.count(category),
            Some(window) => record.stats().get(category).count(window),
        }
    }
}

/// Assign every contributor a rank for every metric.
#[must_use]
pub fn rank(mut records: Contributions) -> Contributions {
    for metric in Metric::iter() {
        let values: Vec<u64> = records.values().map(|record| metric.value(record)).collect();

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[b].cmp(&values[a]));

        let mut ranks = vec![0; values.len()];
        for (position, &index) in order.iter().enumerate() {
            ranks[index] = u32::try_from(position + 1).unwrap_or(u32::MAX);
        }

        for (record, rank) in records.values_mut().zip(ranks) {
            let _ = record.rankings_mut().insert(metric, rank);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::reference_time::ReferenceTime;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn reference() -> ReferenceTime {
        ReferenceTime::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
    }

    fn record_with(prs: u64) -> ContributionRecord {
        let mut record = ContributionRecord::default();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        for day in 0..prs {
            record.record_activity(Category::PullRequests, start + chrono::Days::new(day), &reference());
        }
        record
    }

    fn contributions(entries: &[(&str, u64)]) -> Contributions {
        entries.iter().map(|&(name, prs)| (name.to_string(), record_with(prs))).collect()
    }

    #[test]
    fn test_fifteen_metrics() {
        assert_eq!(Metric::iter().count(), 15);
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::Pr.to_string(), "pr");
        assert_eq!(Metric::IssueAllTime.to_string(), "issue_all_time");
        assert_eq!(serde_json::to_string(&Metric::CommitDaily).unwrap(), r#""commit_daily""#);
    }

    #[test]
    fn test_windowed_metrics_rebuild_from_parts() {
        for metric in Metric::iter() {
            if let Some(window) = metric.window() {
                assert_eq!(Metric::windowed(metric.category(), window), metric);
            }
        }
    }

    #[test]
    fn test_distinct_values_rank_descending() {
        let ranked = rank(contributions(&[("alice", 1), ("bob", 3), ("carol", 2)]));
        assert_eq!(ranked["bob"].rank(Metric::Pr), Some(1));
        assert_eq!(ranked["carol"].rank(Metric::Pr), Some(2));
        assert_eq!(ranked["alice"].rank(Metric::Pr), Some(3));
    }

    #[test]
    fn test_ranks_form_a_permutation() {
        let ranked = rank(contributions(&[("a", 5), ("b", 0), ("c", 5), ("d", 2), ("e", 9)]));
        for metric in Metric::iter() {
            let mut ranks: Vec<u32> = ranked.values().map(|r| r.rank(metric).unwrap()).collect();
            ranks.sort_unstable();
            assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn test_ties_keep_alphabetical_order() {
        let ranked = rank(contributions(&[("zed", 2), ("amy", 2), ("mia", 2)]));
        assert_eq!(ranked["amy"].rank(Metric::Pr), Some(1));
        assert_eq!(ranked["mia"].rank(Metric::Pr), Some(2));
        assert_eq!(ranked["zed"].rank(Metric::Pr), Some(3));

        // Nobody has commits, so commit ranks fall back to name order too
        assert_eq!(ranked["amy"].rank(Metric::Commit), Some(1));
        assert_eq!(ranked["zed"].rank(Metric::CommitWeekly), Some(3));
    }

    #[test]
    fn test_rank_is_idempotent() {
        let input = contributions(&[("a", 1), ("b", 1), ("c", 4)]);
        let once = rank(input);
        let twice = rank(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Contributions::new()).is_empty());
    }
}
