//! Per-contributor contribution records and their windowed statistics.

use super::ranking::Metric;
use super::reference_time::{ReferenceTime, Window};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumIter};

/// Contribution records keyed by username, in canonical (alphabetical) order
pub type Contributions = BTreeMap<String, ContributionRecord>;

/// The kinds of activity tracked per contributor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum Category {
    #[strum(serialize = "pull requests")]
    PullRequests,

    #[strum(serialize = "issues")]
    Issues,

    #[strum(serialize = "commits")]
    Commits,
}

/// Counts of activity over different time windows, plus streaks and the daily average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowStats {
    pub daily: u64,
    pub weekly: u64,
    pub monthly: u64,
    pub all_time: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub avg_per_day: f64,
}

impl TimeWindowStats {
    #[must_use]
    pub const fn count(&self, window: Window) -> u64 {
        match window {
            Window::Daily => self.daily,
            Window::Weekly => self.weekly,
            Window::Monthly => self.monthly,
            Window::AllTime => self.all_time,
        }
    }

    const fn count_mut(&mut self, window: Window) -> &mut u64 {
        match window {
            Window::Daily => &mut self.daily,
            Window::Weekly => &mut self.weekly,
            Window::Monthly => &mut self.monthly,
            Window::AllTime => &mut self.all_time,
        }
    }
}

/// Per-category statistics of one contributor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionStats {
    pub prs: TimeWindowStats,
    pub issues: TimeWindowStats,
    pub commits: TimeWindowStats,
}

impl ContributionStats {
    #[must_use]
    pub const fn get(&self, category: Category) -> &TimeWindowStats {
        match category {
            Category::PullRequests => &self.prs,
            Category::Issues => &self.issues,
            Category::Commits => &self.commits,
        }
    }

    pub(crate) const fn get_mut(&mut self, category: Category) -> &mut TimeWindowStats {
        match category {
            Category::PullRequests => &mut self.prs,
            Category::Issues => &mut self.issues,
            Category::Commits => &mut self.commits,
        }
    }
}

/// Everything known about one contributor.
///
/// The raw counts and the `all_time` buckets are two views of the same
/// accumulation; they only ever change together through [`Self::record_activity`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pr_count: u64,
    issues_count: u64,
    commits_count: u64,
    pr_dates: BTreeSet<NaiveDate>,
    issue_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    commit_dates: BTreeSet<NaiveDate>,
    stats: ContributionStats,
    #[serde(default)]
    rankings: BTreeMap<Metric, u32>,

    /// Activity count per calendar month, keyed `YYYY-MM`
    #[serde(default)]
    monthly_activity: BTreeMap<String, u64>,

    /// Slugs of the repositories this contributor appeared in
    #[serde(default)]
    repositories: BTreeSet<String>,
}

impl ContributionRecord {
    #[must_use]
    pub const fn count(&self, category: Category) -> u64 {
        match category {
            Category::PullRequests => self.pr_count,
            Category::Issues => self.issues_count,
            Category::Commits => self.commits_count,
        }
    }

    /// Distinct days with activity in `category`
    #[must_use]
    pub const fn dates(&self, category: Category) -> &BTreeSet<NaiveDate> {
        match category {
            Category::PullRequests => &self.pr_dates,
            Category::Issues => &self.issue_dates,
            Category::Commits => &self.commit_dates,
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &ContributionStats {
        &self.stats
    }

    #[must_use]
    pub const fn rankings(&self) -> &BTreeMap<Metric, u32> {
        &self.rankings
    }

    #[must_use]
    pub fn rank(&self, metric: Metric) -> Option<u32> {
        self.rankings.get(&metric).copied()
    }

    /// Activity across all categories per calendar month, keyed `YYYY-MM`
    #[must_use]
    pub const fn monthly_activity(&self) -> &BTreeMap<String, u64> {
        &self.monthly_activity
    }

    #[must_use]
    pub const fn repositories(&self) -> &BTreeSet<String> {
        &self.repositories
    }

    /// Count one activity of `category` that happened on `date`.
    ///
    /// Bumps the raw count, every window bucket `date` falls into and the
    /// month's activity, and records the date for streak computation.
    pub fn record_activity(&mut self, category: Category, date: NaiveDate, reference: &ReferenceTime) {
        let (count, dates) = match category {
            Category::PullRequests => (&mut self.pr_count, &mut self.pr_dates),
            Category::Issues => (&mut self.issues_count, &mut self.issue_dates),
            Category::Commits => (&mut self.commits_count, &mut self.commit_dates),
        };

        *count += 1;
        let _ = dates.insert(date);
        *self.monthly_activity.entry(date.format("%Y-%m").to_string()).or_default() += 1;

        let stats = self.stats.get_mut(category);
        for window in [Window::Daily, Window::Weekly, Window::Monthly, Window::AllTime] {
            if reference.contains(window, date) {
                *stats.count_mut(window) += 1;
            }
        }
    }

    pub(crate) fn add_repository(&mut self, slug: &str) {
        if !self.repositories.contains(slug) {
            let _ = self.repositories.insert(slug.to_string());
        }
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut ContributionStats {
        &mut self.stats
    }

    pub(crate) const fn rankings_mut(&mut self) -> &mut BTreeMap<Metric, u32> {
        &mut self.rankings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use strum::IntoEnumIterator;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reference() -> ReferenceTime {
        ReferenceTime::new(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(), date("2024-03-15"))
    }

    #[test]
    fn test_record_activity_buckets() {
        let mut record = ContributionRecord::default();
        let r = reference();

        record.record_activity(Category::PullRequests, date("2024-03-15"), &r);
        record.record_activity(Category::PullRequests, date("2024-03-10"), &r);
        record.record_activity(Category::PullRequests, date("2024-02-20"), &r);
        record.record_activity(Category::PullRequests, date("2023-01-01"), &r);

        let stats = record.stats().get(Category::PullRequests);
        assert_eq!(stats.daily, 1);
        assert_eq!(stats.weekly, 2);
        assert_eq!(stats.monthly, 3);
        assert_eq!(stats.all_time, 4);
        assert_eq!(record.count(Category::PullRequests), 4);
    }

    #[test]
    fn test_same_day_activity_counts_twice_but_dates_once() {
        let mut record = ContributionRecord::default();
        let r = reference();

        record.record_activity(Category::Commits, date("2024-03-14"), &r);
        record.record_activity(Category::Commits, date("2024-03-14"), &r);

        assert_eq!(record.count(Category::Commits), 2);
        assert_eq!(record.dates(Category::Commits).len(), 1);
    }

    #[test]
    fn test_count_matches_all_time_for_every_category() {
        let mut record = ContributionRecord::default();
        let r = reference();

        for (i, category) in Category::iter().enumerate() {
            for day in 0..=i {
                let d = date("2024-01-01") + chrono::Days::new(day as u64);
                record.record_activity(category, d, &r);
            }
        }

        for category in Category::iter() {
            assert_eq!(record.count(category), record.stats().get(category).all_time);
        }
    }

    #[test]
    fn test_monthly_activity_spans_categories() {
        let mut record = ContributionRecord::default();
        let r = reference();

        record.record_activity(Category::PullRequests, date("2024-03-01"), &r);
        record.record_activity(Category::Commits, date("2024-03-14"), &r);
        record.record_activity(Category::Commits, date("2024-03-14"), &r);
        record.record_activity(Category::Issues, date("2023-12-31"), &r);

        let months: Vec<(&str, u64)> = record.monthly_activity().iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(months, vec![("2023-12", 1), ("2024-03", 3)]);
    }

    #[test]
    fn test_repositories_are_distinct_and_sorted() {
        let mut record = ContributionRecord::default();
        record.add_repository("acme/widgets");
        record.add_repository("acme/gadgets");
        record.add_repository("acme/widgets");

        let repos: Vec<&str> = record.repositories().iter().map(String::as_str).collect();
        assert_eq!(repos, vec!["acme/gadgets", "acme/widgets"]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut record = ContributionRecord::default();
        record.record_activity(Category::Issues, date("2024-03-15"), &reference());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["issues_count"], 1);
        assert_eq!(value["issue_dates"][0], "2024-03-15");
        assert_eq!(value["stats"]["issues"]["daily"], 1);
        assert_eq!(value["stats"]["issues"]["all_time"], 1);
        assert_eq!(value["stats"]["prs"]["avg_per_day"], 0.0);
        assert!(value["stats"]["commits"]["current_streak"].is_number());
        assert!(value["rankings"].as_object().unwrap().is_empty());
        assert_eq!(value["monthly_activity"]["2024-03"], 1);
        assert!(value["repositories"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_without_commit_dates() {
        let json = r#"{
            "pr_count": 0, "issues_count": 0, "commits_count": 0,
            "pr_dates": [], "issue_dates": [],
            "stats": {
                "prs": { "daily": 0, "weekly": 0, "monthly": 0, "all_time": 0, "current_streak": 0, "longest_streak": 0, "avg_per_day": 0.0 },
                "issues": { "daily": 0, "weekly": 0, "monthly": 0, "all_time": 0, "current_streak": 0, "longest_streak": 0, "avg_per_day": 0.0 },
                "commits": { "daily": 0, "weekly": 0, "monthly": 0, "all_time": 0, "current_streak": 0, "longest_streak": 0, "avg_per_day": 0.0 }
            }
        }"#;

        let record: ContributionRecord = serde_json::from_str(json).unwrap();
        assert!(record.dates(Category::Commits).is_empty());
        assert!(record.rankings().is_empty());
        assert!(record.monthly_activity().is_empty());
        assert!(record.repositories().is_empty());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::PullRequests.to_string(), "pull requests");
        assert_eq!(Category::Commits.to_string(), "commits");
    }
}
