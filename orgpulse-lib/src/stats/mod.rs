//! Per-contributor statistics.
//!
//! Raw activity is folded into [`ContributionRecord`]s by the
//! [`ContributionAggregator`], then finalized with streaks and averages and
//! ranked across all contributors.

mod aggregator;
mod hall_of_fame;
mod ranking;
mod record;
mod reference_time;
mod streak;
mod summary;

pub use aggregator::ContributionAggregator;
pub use hall_of_fame::{HallOfFame, LeaderboardEntry, Leaderboards, UTC_TIMESTAMP_FORMAT, hall_of_fame};
pub use ranking::{Metric, rank};
pub use record::{Category, ContributionRecord, ContributionStats, Contributions, TimeWindowStats};
pub use reference_time::{ReferenceTime, TIMESTAMP_FORMAT, Window};
pub use streak::{Streaks, streaks};
pub use summary::{ActivityTrends, OrganizationSummary, summarize};

/// Finalize and rank accumulated records, producing the published shape.
#[must_use]
pub fn compile(records: Contributions, reference: ReferenceTime) -> Contributions {
    rank(ContributionAggregator::new(reference).finalize(records))
}
