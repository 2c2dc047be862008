use super::ranking::Metric;
use super::record::{Category, Contributions};
use super::reference_time::Window;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of `last_updated` in published artifacts
pub const UTC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub count: u64,
}

/// Top contributors of one category, per window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboards {
    pub daily: Vec<LeaderboardEntry>,
    pub weekly: Vec<LeaderboardEntry>,
    pub monthly: Vec<LeaderboardEntry>,
    pub all_time: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallOfFame {
    pub last_updated: String,
    pub pr: Leaderboards,
    pub issues: Leaderboards,
    pub commits: Leaderboards,
}

/// Build the leaderboards: for every category and window, the first `size`
/// contributors in rank order, leaving out anyone with nothing to show.
#[must_use]
pub fn hall_of_fame(records: &Contributions, size: usize, generated_at: DateTime<Utc>) -> HallOfFame {
    HallOfFame {
        last_updated: generated_at.format(UTC_TIMESTAMP_FORMAT).to_string(),
        pr: leaderboards(records, Category::PullRequests, size),
        issues: leaderboards(records, Category::Issues, size),
        commits: leaderboards(records, Category::Commits, size),
    }
}

fn leaderboards(records: &Contributions, category: Category, size: usize) -> Leaderboards {
    Leaderboards {
        daily: leaderboard(records, Metric::windowed(category, Window::Daily), size),
        weekly: leaderboard(records, Metric::windowed(category, Window::Weekly), size),
        monthly: leaderboard(records, Metric::windowed(category, Window::Monthly), size),
        all_time: leaderboard(records, Metric::windowed(category, Window::AllTime), size),
    }
}

fn leaderboard(records: &Contributions, metric: Metric, size: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = records
        .iter()
        .map(|(username, record)| LeaderboardEntry {
            username: username.clone(),
            count: metric.value(record),
        })
        .filter(|entry| entry.count > 0)
        .collect();

    // stable: ties stay in username order, matching the ranks
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(size);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{ContributionRecord, ReferenceTime};
    use chrono::{NaiveDate, TimeZone};

    fn reference() -> ReferenceTime {
        ReferenceTime::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
    }

    fn record(prs_today: u64, old_commits: u64) -> ContributionRecord {
        let r = reference();
        let mut record = ContributionRecord::default();
        for _ in 0..prs_today {
            record.record_activity(Category::PullRequests, r.today(), &r);
        }
        for _ in 0..old_commits {
            record.record_activity(Category::Commits, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), &r);
        }
        record
    }

    fn sample() -> Contributions {
        [("alice", record(2, 0)), ("bob", record(5, 1)), ("carol", record(2, 7)), ("dan", record(0, 0))]
            .into_iter()
            .map(|(name, record)| (name.to_string(), record))
            .collect()
    }

    fn names(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.username.as_str()).collect()
    }

    #[test]
    fn test_order_and_ties() {
        let hof = hall_of_fame(&sample(), 10, reference().captured_at());
        assert_eq!(names(&hof.pr.daily), vec!["bob", "alice", "carol"]);
        assert_eq!(hof.pr.daily[0].count, 5);
        assert_eq!(names(&hof.pr.all_time), vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn test_zero_counts_are_omitted() {
        let hof = hall_of_fame(&sample(), 10, reference().captured_at());
        assert_eq!(names(&hof.commits.all_time), vec!["carol", "bob"]);
        assert!(hof.commits.daily.is_empty());
        assert!(hof.issues.all_time.is_empty());
    }

    #[test]
    fn test_size_limit() {
        let hof = hall_of_fame(&sample(), 1, reference().captured_at());
        assert_eq!(names(&hof.pr.weekly), vec!["bob"]);
    }

    #[test]
    fn test_last_updated_format() {
        let hof = hall_of_fame(&Contributions::new(), 10, reference().captured_at());
        assert_eq!(hof.last_updated, "2024-03-15 12:00:00 UTC");
    }

    #[test]
    fn test_serialized_keys() {
        let value = serde_json::to_value(hall_of_fame(&sample(), 10, reference().captured_at())).unwrap();
        assert!(value["pr"]["all_time"].is_array());
        assert!(value["issues"]["daily"].is_array());
        assert_eq!(value["commits"]["all_time"][0]["username"], "carol");
    }
}
