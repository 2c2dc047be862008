//! Folding raw repository activity into per-contributor records.

use super::record::{Category, Contributions};
use super::reference_time::ReferenceTime;
use super::streak::streaks;
use crate::github::RawActivityBatch;
use strum::IntoEnumIterator;

const LOG_TARGET: &str = "aggregator";

/// Folds per-repository activity into per-contributor records.
///
/// All window cutoffs come from one [`ReferenceTime`], so every record of a
/// crawl is bucketed identically.
#[derive(Debug, Clone, Copy)]
pub struct ContributionAggregator {
    reference: ReferenceTime,
}

impl ContributionAggregator {
    #[must_use]
    pub const fn new(reference: ReferenceTime) -> Self {
        Self { reference }
    }

    #[must_use]
    pub const fn reference(&self) -> &ReferenceTime {
        &self.reference
    }

    /// Fold one repository's activity into `records`.
    ///
    /// Everyone appearing in the batch gets a record, even without countable
    /// activity, and has the repository added to their record. Pull-request-flagged
    /// issues are skipped.
    #[must_use]
    pub fn fold(&self, mut records: Contributions, batch: &RawActivityBatch) -> Contributions {
        let before = records.len();

        for login in &batch.contributors {
            let _ = records.entry(login.clone()).or_default();
        }

        for pr in &batch.pull_requests {
            self.record(&mut records, &pr.author, Category::PullRequests, pr.activity_date());
        }

        for issue in batch.issues.iter().filter(|issue| !issue.is_pull_request) {
            self.record(&mut records, &issue.author, Category::Issues, issue.created_at.date_naive());
        }

        for commit in &batch.commits {
            self.record(&mut records, &commit.author, Category::Commits, commit.committed_at.date_naive());
        }

        let slug = batch.repository.slug();
        let participants = batch
            .contributors
            .iter()
            .chain(batch.pull_requests.iter().map(|pr| &pr.author))
            .chain(batch.issues.iter().filter(|issue| !issue.is_pull_request).map(|issue| &issue.author))
            .chain(batch.commits.iter().map(|commit| &commit.author));
        for login in participants {
            if let Some(record) = records.get_mut(login) {
                record.add_repository(&slug);
            }
        }

        log::debug!(
            target: LOG_TARGET,
            "Folded '{}': {} new contributor(s), {} total",
            batch.repository,
            records.len() - before,
            records.len()
        );

        records
    }

    /// Derive streaks and daily averages from the accumulated dates and buckets.
    ///
    /// Recomputes from scratch, so it can run on partially-finalized records.
    #[must_use]
    pub fn finalize(&self, mut records: Contributions) -> Contributions {
        let days = self.reference.averaging_days();

        for record in records.values_mut() {
            for category in Category::iter() {
                let run = streaks(record.dates(category));
                let stats = record.stats_mut().get_mut(category);
                stats.current_streak = run.current_streak;
                stats.longest_streak = run.longest_streak;
                stats.avg_per_day = average_per_day(stats.monthly, days);
            }
        }

        records
    }

    fn record(&self, records: &mut Contributions, author: &str, category: Category, date: chrono::NaiveDate) {
        records
            .entry(author.to_string())
            .or_default()
            .record_activity(category, date, &self.reference);
    }
}

/// `monthly / days`, rounded to one decimal place with ties going to the even digit.
#[expect(clippy::cast_precision_loss, reason = "activity counts are far below 2^52")]
fn average_per_day(monthly: u64, days: u32) -> f64 {
    let average = monthly as f64 / f64::from(days.max(1));
    format!("{average:.1}").parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{CommitActivity, IssueActivity, PullRequestActivity, Repository};
    use crate::stats::{ContributionRecord, Metric};
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn aggregator() -> ContributionAggregator {
        ContributionAggregator::new(ReferenceTime::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        ))
    }

    fn batch() -> RawActivityBatch {
        let mut batch = RawActivityBatch::new(Repository::new("acme", "widgets"));
        batch.contributors = vec!["alice".into(), "quiet".into()];
        batch.pull_requests = vec![
            PullRequestActivity {
                author: "alice".into(),
                created_at: ts("2024-03-10T10:00:00Z"),
                closed_at: Some(ts("2024-03-14T10:00:00Z")),
                merged_at: Some(ts("2024-03-14T09:00:00Z")),
            },
            PullRequestActivity {
                author: "bob".into(),
                created_at: ts("2024-01-02T10:00:00Z"),
                closed_at: None,
                merged_at: Some(ts("2024-01-03T10:00:00Z")),
            },
        ];
        batch.issues = vec![
            IssueActivity {
                author: "alice".into(),
                created_at: ts("2024-03-15T08:00:00Z"),
                is_pull_request: false,
            },
            IssueActivity {
                author: "carol".into(),
                created_at: ts("2024-03-15T08:00:00Z"),
                is_pull_request: true,
            },
        ];
        batch.commits = vec![
            CommitActivity {
                author: "alice".into(),
                committed_at: ts("2024-03-13T22:00:00+02:00"),
            },
            CommitActivity {
                author: "alice".into(),
                committed_at: ts("2024-03-14T07:00:00+02:00"),
            },
        ];
        batch
    }

    #[test]
    fn test_fold_creates_records_for_every_participant() {
        let records = aggregator().fold(Contributions::new(), &batch());
        let names: Vec<&str> = records.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alice", "bob", "quiet"]);
        assert_eq!(records["quiet"], ContributionRecord::default());
    }

    #[test]
    fn test_fold_skips_pull_request_flagged_issues() {
        let records = aggregator().fold(Contributions::new(), &batch());
        assert!(!records.contains_key("carol"));
        assert_eq!(records["alice"].count(Category::Issues), 1);
    }

    #[test]
    fn test_fold_buckets_by_reference_time() {
        let records = aggregator().fold(Contributions::new(), &batch());

        let alice = records["alice"].stats();
        assert_eq!(alice.prs.daily, 1);
        assert_eq!(alice.prs.all_time, 1);
        assert_eq!(alice.issues.daily, 1);
        assert_eq!(alice.commits.weekly, 2);
        assert_eq!(alice.commits.daily, 1);

        let bob = records["bob"].stats();
        assert_eq!(bob.prs.monthly, 0);
        assert_eq!(bob.prs.all_time, 1);
    }

    #[test]
    fn test_fold_accumulates_across_batches() {
        let agg = aggregator();
        let once = agg.fold(Contributions::new(), &batch());
        let twice = agg.fold(once, &batch());
        assert_eq!(twice["alice"].count(Category::Commits), 4);
        assert_eq!(twice["alice"].stats().commits.all_time, 4);
        assert_eq!(twice["alice"].dates(Category::Commits).len(), 2);
    }

    #[test]
    fn test_finalize_streaks_and_averages() {
        let agg = aggregator();
        let records = agg.finalize(agg.fold(Contributions::new(), &batch()));

        let commits = &records["alice"].stats().commits;
        assert_eq!(commits.current_streak, 2);
        assert_eq!(commits.longest_streak, 2);
        assert!((commits.avg_per_day - 0.1).abs() < f64::EPSILON);

        assert_eq!(records["quiet"].stats().prs.current_streak, 0);
    }

    #[test]
    fn test_full_pipeline_is_deterministic() {
        let run = || {
            let agg = aggregator();
            crate::stats::rank(agg.finalize(agg.fold(Contributions::new(), &batch())))
        };

        let first = run();
        assert_eq!(first, run());
        assert_eq!(first["alice"].rank(Metric::Commit), Some(1));
    }

    #[test]
    fn test_average_per_day_rounding() {
        assert!((average_per_day(7, 15) - 0.5).abs() < f64::EPSILON);
        assert!((average_per_day(10, 3) - 3.3).abs() < f64::EPSILON);
        assert!((average_per_day(0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_per_day_ties_round_to_even() {
        assert!((average_per_day(1, 4) - 0.2).abs() < f64::EPSILON);
        assert!((average_per_day(5, 4) - 1.2).abs() < f64::EPSILON);
        assert!((average_per_day(3, 12) - 0.2).abs() < f64::EPSILON);
        assert!((average_per_day(1, 20) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fold_tracks_repositories_per_participant() {
        let agg = aggregator();
        let mut other = RawActivityBatch::new(Repository::new("acme", "gadgets"));
        other.commits = vec![CommitActivity {
            author: "bob".into(),
            committed_at: ts("2024-03-01T10:00:00Z"),
        }];

        let records = agg.fold(agg.fold(Contributions::new(), &batch()), &other);

        let repos = |login: &str| records[login].repositories().iter().cloned().collect::<Vec<_>>();
        assert_eq!(repos("alice"), vec!["acme/widgets"]);
        assert_eq!(repos("bob"), vec!["acme/gadgets", "acme/widgets"]);
        assert_eq!(repos("quiet"), vec!["acme/widgets"]);
        assert!(!records.contains_key("carol"));
    }

    #[test]
    fn test_fold_tracks_monthly_activity() {
        let records = aggregator().fold(Contributions::new(), &batch());
        assert_eq!(records["alice"].monthly_activity()["2024-03"], 4);
        assert_eq!(records["bob"].monthly_activity()["2024-01"], 1);
    }
}
