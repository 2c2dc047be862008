//! Rate-limit buckets, their reported quota and the wait decision.

use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use core::time::Duration;
use serde::Deserialize;
use strum::{Display as StrumDisplay, EnumIter};

/// Seconds added past the reported reset instant before retrying
const RESET_GRACE_SECS: i64 = 2;

/// Shortest wait ever taken once a bucket is considered exhausted
const MIN_WAIT: Duration = Duration::from_secs(1);

/// The independently-quota'd resource classes of the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Bucket {
    Core,
    Search,
}

/// Quota state of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl Display for RateLimitInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{} remaining, resets at {}",
            self.remaining,
            self.limit,
            self.reset_at.with_timezone(&chrono::Local).format("%T")
        )
    }
}

/// Last observed quota for every bucket.
///
/// Owned by a single [`RateLimitedClient`](super::RateLimitedClient) so the
/// whole run shares one budget. Deserializes directly from the
/// `/rate_limit` payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "wire::RateLimitResponse")]
pub struct RateLimitBudget {
    core: Option<RateLimitInfo>,
    search: Option<RateLimitInfo>,
}

impl RateLimitBudget {
    #[must_use]
    pub const fn get(&self, bucket: Bucket) -> Option<RateLimitInfo> {
        match bucket {
            Bucket::Core => self.core,
            Bucket::Search => self.search,
        }
    }

    /// Merge a fresh status snapshot, keeping older values for buckets it lacks.
    pub fn update(&mut self, fresh: Self) {
        self.core = fresh.core.or(self.core);
        self.search = fresh.search.or(self.search);
    }
}

/// What to do before issuing a request against a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDecision {
    /// Enough quota remains
    Proceed,

    /// Sleep this long, then proceed
    Wait(Duration),

    /// The required wait exceeds the ceiling; the caller should checkpoint and stop
    Abort(Duration),
}

/// Decide whether a request may go out now given the bucket's quota.
///
/// A bucket with `remaining <= safety_margin` is treated as exhausted and the
/// wait runs until two seconds past the reported reset, never less than one
/// second.
#[must_use]
pub fn compute_wait(info: &RateLimitInfo, now: DateTime<Utc>, safety_margin: u64, ceiling: Duration) -> WaitDecision {
    if info.remaining > safety_margin {
        return WaitDecision::Proceed;
    }

    let wait = (info.reset_at + chrono::Duration::seconds(RESET_GRACE_SECS) - now).to_std().unwrap_or(Duration::ZERO).max(MIN_WAIT);
    if wait > ceiling {
        WaitDecision::Abort(wait)
    } else {
        WaitDecision::Wait(wait)
    }
}

mod wire {
    use super::{RateLimitBudget, RateLimitInfo};
    use chrono::DateTime;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct RateLimitResponse {
        resources: Resources,
    }

    #[derive(Debug, Deserialize)]
    struct Resources {
        core: Option<Resource>,
        search: Option<Resource>,
    }

    #[derive(Debug, Deserialize)]
    struct Resource {
        limit: u64,
        remaining: u64,
        reset: i64,
    }

    impl Resource {
        fn into_info(self) -> Option<RateLimitInfo> {
            Some(RateLimitInfo {
                limit: self.limit,
                remaining: self.remaining,
                reset_at: DateTime::from_timestamp(self.reset, 0)?,
            })
        }
    }

    impl From<RateLimitResponse> for RateLimitBudget {
        fn from(value: RateLimitResponse) -> Self {
            Self {
                core: value.resources.core.and_then(Resource::into_info),
                search: value.resources.search.and_then(Resource::into_info),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CEILING: Duration = Duration::from_secs(60);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn info(remaining: u64, reset_in_secs: i64) -> RateLimitInfo {
        RateLimitInfo {
            limit: 30,
            remaining,
            reset_at: now() + chrono::Duration::seconds(reset_in_secs),
        }
    }

    #[test]
    fn test_plenty_remaining_proceeds() {
        assert_eq!(compute_wait(&info(6, 30), now(), 5, CEILING), WaitDecision::Proceed);
    }

    #[test]
    fn test_low_remaining_waits_until_reset() {
        let WaitDecision::Wait(wait) = compute_wait(&info(2, 30), now(), 5, CEILING) else {
            panic!("expected a wait");
        };
        assert!(wait >= Duration::from_secs(28));
        assert!(wait <= Duration::from_secs(32));
    }

    #[test]
    fn test_margin_is_inclusive() {
        assert!(matches!(compute_wait(&info(5, 10), now(), 5, CEILING), WaitDecision::Wait(_)));
    }

    #[test]
    fn test_reset_in_the_past_waits_minimum() {
        assert_eq!(
            compute_wait(&info(0, -120), now(), 5, CEILING),
            WaitDecision::Wait(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_long_wait_aborts() {
        assert_eq!(
            compute_wait(&info(0, 600), now(), 5, CEILING),
            WaitDecision::Abort(Duration::from_secs(602))
        );
    }

    #[test]
    fn test_wait_at_ceiling_is_taken() {
        assert_eq!(
            compute_wait(&info(0, 58), now(), 5, CEILING),
            WaitDecision::Wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_budget_deserialize() {
        let json = r#"{
            "resources": {
                "core": { "limit": 5000, "remaining": 4999, "reset": 1717243200, "used": 1 },
                "search": { "limit": 30, "remaining": 12, "reset": 1717243260, "used": 18 },
                "graphql": { "limit": 5000, "remaining": 5000, "reset": 1717243200 }
            },
            "rate": { "limit": 5000, "remaining": 4999, "reset": 1717243200 }
        }"#;

        let budget: RateLimitBudget = serde_json::from_str(json).unwrap();
        let core = budget.get(Bucket::Core).unwrap();
        assert_eq!(core.limit, 5000);
        assert_eq!(core.remaining, 4999);
        assert_eq!(core.reset_at.timestamp(), 1_717_243_200);
        assert_eq!(budget.get(Bucket::Search).unwrap().remaining, 12);
    }

    #[test]
    fn test_budget_missing_bucket() {
        let json = r#"{ "resources": { "core": { "limit": 60, "remaining": 59, "reset": 1717243200 } } }"#;
        let budget: RateLimitBudget = serde_json::from_str(json).unwrap();
        assert!(budget.get(Bucket::Core).is_some());
        assert!(budget.get(Bucket::Search).is_none());
    }

    #[test]
    fn test_budget_update_keeps_known_buckets() {
        let mut budget = RateLimitBudget {
            core: Some(info(100, 10)),
            search: Some(info(20, 10)),
        };
        budget.update(RateLimitBudget {
            core: Some(info(99, 10)),
            search: None,
        });

        assert_eq!(budget.get(Bucket::Core).unwrap().remaining, 99);
        assert_eq!(budget.get(Bucket::Search).unwrap().remaining, 20);
    }

    #[test]
    fn test_bucket_display() {
        assert_eq!(Bucket::Core.to_string(), "core");
        assert_eq!(Bucket::Search.to_string(), "search");
    }
}
