//! Access to the GitHub REST API.
//!
//! [`RateLimitedClient`] issues every request and owns the shared rate-limit
//! budget; [`OrganizationCrawler`] builds on it to enumerate an
//! organization's repositories and collect their activity.

mod client;
mod crawler;
mod models;
mod rate_limit;
mod repository;

pub use client::{ApiResult, ClientSettings, RateLimitedClient};
pub use crawler::{
    CommitActivity, IssueActivity, OrganizationCrawler, PullRequestActivity, QuotaExhausted, RawActivityBatch, RepositoryMetrics,
};
pub use rate_limit::{Bucket, RateLimitBudget, RateLimitInfo, WaitDecision, compute_wait};
pub use repository::Repository;
