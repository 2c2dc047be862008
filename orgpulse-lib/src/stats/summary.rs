use super::hall_of_fame::UTC_TIMESTAMP_FORMAT;
use super::record::{Category, Contributions, TimeWindowStats};
use crate::github::RepositoryMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Organization-wide totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub total_contributors: u64,

    /// Contributors with any activity in the weekly window
    pub active_contributors: u64,

    pub total_prs: u64,
    pub total_issues: u64,
    pub total_commits: u64,
    pub stars_count: u64,
    pub forks_count: u64,
    pub repositories_processed: u64,
    pub activity_trends: ActivityTrends,
    pub last_updated: String,
}

/// Activity summed over every contributor and category, per window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTrends {
    pub today_total: u64,
    pub week_total: u64,
    pub month_total: u64,
}

#[must_use]
pub fn summarize(
    records: &Contributions,
    repositories: &BTreeMap<String, RepositoryMetrics>,
    generated_at: DateTime<Utc>,
) -> OrganizationSummary {
    let total = |category: Category| records.values().map(|record| record.count(category)).sum::<u64>();

    let window_total = |window: fn(&TimeWindowStats) -> u64| {
        records
            .values()
            .flat_map(|record| Category::iter().map(move |category| window(record.stats().get(category))))
            .sum::<u64>()
    };

    let active = records
        .values()
        .filter(|record| Category::iter().any(|category| record.stats().get(category).weekly > 0))
        .count();

    OrganizationSummary {
        total_contributors: records.len() as u64,
        active_contributors: active as u64,
        total_prs: total(Category::PullRequests),
        total_issues: total(Category::Issues),
        total_commits: total(Category::Commits),
        stars_count: repositories.values().map(|m| m.stars).sum(),
        forks_count: repositories.values().map(|m| m.forks).sum(),
        repositories_processed: repositories.len() as u64,
        activity_trends: ActivityTrends {
            today_total: window_total(|stats| stats.daily),
            week_total: window_total(|stats| stats.weekly),
            month_total: window_total(|stats| stats.monthly),
        },
        last_updated: generated_at.format(UTC_TIMESTAMP_FORMAT).to_string(),
    }
}
