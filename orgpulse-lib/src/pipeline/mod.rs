//! The top-level crawl loop.
//!
//! A crawl lists an organization's repositories, skips those a checkpoint
//! already covers, and collects the rest one at a time. After every
//! repository the accumulated state is folded and saved, so stopping at any
//! point (an interrupt, or quota that would take too long to come back)
//! loses at most the repository in flight.

mod progress;

pub use progress::{NoProgress, Progress};

use crate::Result;
use crate::checkpoint::{CheckpointState, CheckpointStore, LoadOutcome, acquire_crawl_lock};
use crate::github::{Bucket, OrganizationCrawler, QuotaExhausted, RateLimitInfo, Repository};
use crate::stats::{ContributionAggregator, ReferenceTime};
use core::fmt::{Display, Formatter};
use core::sync::atomic::{AtomicU64, Ordering};
use ohno::bail;
use std::sync::{Arc, Mutex, PoisonError};
use strum::IntoEnumIterator;

const LOG_TARGET: &str = "  pipeline";

/// Why a crawl stopped before covering every repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    QuotaExhausted(RateLimitInfo),
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::QuotaExhausted(info) => write!(f, "rate limit exhausted ({info})"),
        }
    }
}

/// How a crawl ended
#[derive(Debug)]
pub enum CrawlOutcome {
    /// Every listed repository has been folded into the state.
    Complete(CheckpointState),

    /// The crawl stopped early; the checkpoint holds everything gathered so far.
    Stopped {
        reason: StopReason,
        processed: usize,

        /// Number of listed repositories, unknown when the listing itself was cut short
        total: Option<usize>,
    },
}

/// Drives an [`OrganizationCrawler`] across an organization, checkpointing as it goes.
#[derive(Debug)]
pub struct Pipeline<'a, P: Progress + ?Sized> {
    crawler: OrganizationCrawler,
    store: CheckpointStore,
    progress: &'a P,
}

impl<'a, P: Progress + ?Sized> Pipeline<'a, P> {
    #[must_use]
    pub const fn new(crawler: OrganizationCrawler, store: CheckpointStore, progress: &'a P) -> Self {
        Self { crawler, store, progress }
    }

    #[must_use]
    pub const fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Crawl `organization`, resuming from the checkpoint unless `fresh` is set.
    ///
    /// `interrupt` resolving stops the crawl between requests; the repository
    /// in flight is dropped and the checkpoint is saved. Errors are limited to
    /// checkpoint I/O and an organization with no listable repositories.
    pub async fn crawl<F>(&mut self, organization: &str, fresh: bool, interrupt: F) -> Result<CrawlOutcome>
    where
        F: Future<Output = ()>,
    {
        let _lock = acquire_crawl_lock(self.store.path()).await?;
        tokio::pin!(interrupt);

        let mut state = self.resume(organization, fresh);
        let aggregator = ContributionAggregator::new(state.reference_time());

        self.report_rate_limits("Starting").await;

        self.progress.set_phase("Listing");
        let listing_message = format!("repositories of '{organization}'");
        self.progress.set_indeterminate(Box::new(move || listing_message.clone()));

        let listed = tokio::select! {
            biased;
            () = &mut interrupt => None,
            listed = self.crawler.list_repositories(organization) => Some(listed),
        };

        let repos = match listed {
            None => return self.stop(&state, StopReason::Interrupted, None),
            Some(Err(QuotaExhausted(info))) => return self.stop(&state, StopReason::QuotaExhausted(info), None),
            Some(Ok(repos)) => repos,
        };

        if repos.is_empty() {
            self.progress.done();
            bail!("no repositories found for organization '{organization}'");
        }

        let total = repos.len();
        let pending: Vec<&Repository> = repos.iter().filter(|repo| !state.is_processed(repo)).collect();
        if pending.len() < total {
            log::info!(target: LOG_TARGET, "{} of {total} repositories already processed", total - pending.len());
        }

        let done = Arc::new(AtomicU64::new((total - pending.len()) as u64));
        let current = Arc::new(Mutex::new(String::new()));
        self.progress.set_phase("Crawling");
        self.progress.set_determinate({
            let done = Arc::clone(&done);
            let current = Arc::clone(&current);
            Box::new(move || {
                let name = current.lock().unwrap_or_else(PoisonError::into_inner).clone();
                (total as u64, done.load(Ordering::Relaxed), name)
            })
        });

        for repo in pending {
            log::info!(
                target: LOG_TARGET,
                "Processing '{repo}' ({}/{total})",
                done.load(Ordering::Relaxed) + 1
            );
            *current.lock().unwrap_or_else(PoisonError::into_inner) = repo.slug();

            let collected = tokio::select! {
                biased;
                () = &mut interrupt => None,
                batch = self.crawler.collect_repository(repo) => Some(batch),
            };

            match collected {
                None => {
                    log::warn!(target: LOG_TARGET, "Interrupted while processing '{repo}'");
                    return self.stop(&state, StopReason::Interrupted, Some(total));
                }
                Some(Err(QuotaExhausted(info))) => {
                    return self.stop(&state, StopReason::QuotaExhausted(info), Some(total));
                }
                Some(Ok(batch)) => {
                    state.absorb(&batch, &aggregator);
                    self.store.save(&state)?;
                    let _ = done.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        self.progress.done();
        self.report_rate_limits("Finished").await;
        log::info!(
            target: LOG_TARGET,
            "Processed all {total} repositories of '{organization}', {} contributor(s)",
            state.contributions().len()
        );

        Ok(CrawlOutcome::Complete(state))
    }

    /// Pick up the checkpoint if it belongs to `organization`, or start over.
    fn resume(&self, organization: &str, fresh: bool) -> CheckpointState {
        let start = || CheckpointState::new(organization, ReferenceTime::now());

        if fresh {
            if self.store.exists() {
                log::info!(target: LOG_TARGET, "Ignoring the existing checkpoint at '{}'", self.store.path());
            }
            return start();
        }

        match self.store.load() {
            LoadOutcome::Missing | LoadOutcome::Corrupt { .. } => start(),
            LoadOutcome::Loaded { state, saved_at } if state.organization() != organization => {
                log::warn!(
                    target: LOG_TARGET,
                    "Checkpoint saved at {saved_at} belongs to organization '{}', starting over",
                    state.organization()
                );
                start()
            }
            LoadOutcome::Loaded { state, saved_at } => {
                log::info!(
                    target: LOG_TARGET,
                    "Resuming from checkpoint saved at {saved_at} with {} processed repositories",
                    state.processed_repos().len()
                );
                state
            }
        }
    }

    fn stop(&self, state: &CheckpointState, reason: StopReason, total: Option<usize>) -> Result<CrawlOutcome> {
        self.progress.done();
        self.store.save(state)?;

        let processed = state.processed_repos().len();
        log::warn!(target: LOG_TARGET, "Crawl stopped after {processed} repositories: {reason}");

        Ok(CrawlOutcome::Stopped { reason, processed, total })
    }

    async fn report_rate_limits(&mut self, moment: &str) {
        if let Some(budget) = self.crawler.client_mut().refresh_budget().await {
            for bucket in Bucket::iter() {
                if let Some(info) = budget.get(bucket) {
                    log::info!(target: LOG_TARGET, "{moment}: {bucket} rate limit {info}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Interrupted.to_string(), "interrupted");

        let info = RateLimitInfo {
            limit: 30,
            remaining: 0,
            reset_at: chrono::Utc::now(),
        };
        assert!(StopReason::QuotaExhausted(info).to_string().starts_with("rate limit exhausted (0/30 remaining"));
    }
}
