//! Organization crawl: repository enumeration and per-repository activity collection.
//!
//! Failures are swallowed at the smallest scope possible. A failed page ends
//! repository enumeration with what was gathered so far, and a failed
//! category leaves that category empty for the repository. Only quota
//! exhaustion escapes, as [`QuotaExhausted`], so the caller can checkpoint.

use super::client::{ApiResult, RateLimitedClient};
use super::models::{CommitItem, Contributor, IssueItem, OrgRepository, RepositoryInfo, SearchPage};
use super::rate_limit::{Bucket, RateLimitInfo};
use super::repository::Repository;
use chrono::{DateTime, FixedOffset, NaiveDate};
use core::fmt::{Display, Formatter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const LOG_TARGET: &str = "   crawler";

const ISSUE_SEARCH: &str = "search/issues";
const COMMIT_SEARCH: &str = "search/commits";
const MERGED_PR_QUALIFIERS: &str = "type:pr is:merged";
const ISSUE_QUALIFIERS: &str = "type:issue";

/// A bucket ran dry and cannot be replenished within the wait ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExhausted(pub RateLimitInfo);

impl Display for QuotaExhausted {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "rate limit exhausted ({})", self.0)
    }
}

/// A merged pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestActivity {
    pub author: String,
    pub created_at: DateTime<FixedOffset>,
    pub closed_at: Option<DateTime<FixedOffset>>,
    pub merged_at: Option<DateTime<FixedOffset>>,
}

impl PullRequestActivity {
    /// The day the pull request counts for: merge, else close, else creation.
    #[must_use]
    pub fn activity_date(&self) -> NaiveDate {
        self.merged_at.or(self.closed_at).unwrap_or(self.created_at).date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueActivity {
    pub author: String,
    pub created_at: DateTime<FixedOffset>,
    pub is_pull_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitActivity {
    pub author: String,
    pub committed_at: DateTime<FixedOffset>,
}

/// Popularity figures of one repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetrics {
    pub stars: u64,
    pub forks: u64,
}

/// Everything collected for one repository, consumed once by the aggregator
#[derive(Debug, Clone)]
pub struct RawActivityBatch {
    pub repository: Repository,
    pub metrics: RepositoryMetrics,
    pub contributors: Vec<String>,
    pub pull_requests: Vec<PullRequestActivity>,
    pub issues: Vec<IssueActivity>,
    pub commits: Vec<CommitActivity>,
}

impl RawActivityBatch {
    #[must_use]
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            metrics: RepositoryMetrics::default(),
            contributors: Vec::new(),
            pull_requests: Vec::new(),
            issues: Vec::new(),
            commits: Vec::new(),
        }
    }
}

/// Result of a paginated search
#[derive(Debug)]
enum SearchOutcome<T> {
    /// Every match was returned
    Complete(Vec<T>),

    /// More matches exist than pagination could return
    Truncated(Vec<T>),

    /// The search failed; the category is treated as empty
    Failed,
}

impl<T> SearchOutcome<T> {
    const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated(_))
    }

    fn into_items(self) -> Vec<T> {
        match self {
            Self::Complete(items) | Self::Truncated(items) => items,
            Self::Failed => Vec::new(),
        }
    }
}

fn classify<T>(items: Vec<T>, total_count: u64, incomplete: bool) -> SearchOutcome<T> {
    if incomplete || (items.len() as u64) < total_count {
        SearchOutcome::Truncated(items)
    } else {
        SearchOutcome::Complete(items)
    }
}

/// Walks an organization through a [`RateLimitedClient`].
#[derive(Debug)]
pub struct OrganizationCrawler {
    client: RateLimitedClient,
    page_size: u32,
    max_search_pages: u32,
}

impl OrganizationCrawler {
    #[must_use]
    pub const fn new(client: RateLimitedClient, page_size: u32, max_search_pages: u32) -> Self {
        Self {
            client,
            page_size,
            max_search_pages,
        }
    }

    pub const fn client_mut(&mut self) -> &mut RateLimitedClient {
        &mut self.client
    }

    /// List every repository of `org`, in listing order.
    pub async fn list_repositories(&mut self, org: &str) -> Result<Vec<Repository>, QuotaExhausted> {
        let mut repos = Vec::new();
        let mut page = 1;

        loop {
            let url = format!("{}/orgs/{org}/repos?per_page={}&page={page}", self.client.base_url(), self.page_size);
            match self.client.get_json::<Vec<OrgRepository>>(&url, Bucket::Core).await {
                ApiResult::Success(entries) => {
                    let count = entries.len();
                    repos.extend(entries.into_iter().map(|entry| Repository::new(entry.owner.login, entry.name)));
                    if count < self.page_size as usize {
                        break;
                    }
                }
                ApiResult::Empty => break,
                ApiResult::QuotaExhausted(info) => return Err(QuotaExhausted(info)),
                ApiResult::Failed(e) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch page {page} of the repositories of '{org}': {e:#}");
                    break;
                }
            }

            page += 1;
        }

        log::info!(target: LOG_TARGET, "Found {} repositories in the '{org}' organization", repos.len());
        Ok(repos)
    }

    /// Collect metadata, contributors, merged pull requests, issues, and commits of `repo`.
    pub async fn collect_repository(&mut self, repo: &Repository) -> Result<RawActivityBatch, QuotaExhausted> {
        let mut batch = RawActivityBatch::new(repo.clone());

        batch.metrics = self.repository_metrics(repo).await?;
        batch.contributors = self.contributors(repo).await?;

        let pull_requests = self.search::<IssueItem>(ISSUE_SEARCH, &repo_query(repo, MERGED_PR_QUALIFIERS, None), repo).await?;
        let issues = self.search::<IssueItem>(ISSUE_SEARCH, &repo_query(repo, ISSUE_QUALIFIERS, None), repo).await?;
        let commits = self.search::<CommitItem>(COMMIT_SEARCH, &repo_query(repo, "", None), repo).await?;

        if pull_requests.is_truncated() || issues.is_truncated() || commits.is_truncated() {
            self.collect_per_author(repo, &mut batch, pull_requests, issues, commits).await?;
        } else {
            batch.pull_requests = to_pull_requests(pull_requests.into_items());
            batch.issues = to_issues(issues.into_items());
            batch.commits = to_commits(commits.into_items());
        }

        log::debug!(
            target: LOG_TARGET,
            "Repository '{repo}': {} contributor(s), {} merged PR(s), {} issue(s), {} commit(s)",
            batch.contributors.len(),
            batch.pull_requests.len(),
            batch.issues.len(),
            batch.commits.len()
        );

        Ok(batch)
    }

    /// Re-query truncated categories one author at a time.
    ///
    /// Every truncated category of one author is fetched before moving on to
    /// the next author.
    async fn collect_per_author(
        &mut self,
        repo: &Repository,
        batch: &mut RawActivityBatch,
        pull_requests: SearchOutcome<IssueItem>,
        issues: SearchOutcome<IssueItem>,
        commits: SearchOutcome<CommitItem>,
    ) -> Result<(), QuotaExhausted> {
        let refetch_prs = pull_requests.is_truncated();
        let refetch_issues = issues.is_truncated();
        let refetch_commits = commits.is_truncated();

        let pull_requests = to_pull_requests(pull_requests.into_items());
        let issues = to_issues(issues.into_items());
        let commits = to_commits(commits.into_items());

        let authors: BTreeSet<String> = batch
            .contributors
            .iter()
            .cloned()
            .chain(pull_requests.iter().map(|pr| pr.author.clone()))
            .chain(issues.iter().map(|issue| issue.author.clone()))
            .chain(commits.iter().map(|commit| commit.author.clone()))
            .collect();

        log::info!(
            target: LOG_TARGET,
            "Search results for '{repo}' are truncated, querying {} author(s) individually",
            authors.len()
        );

        batch.pull_requests = if refetch_prs { Vec::new() } else { pull_requests };
        batch.issues = if refetch_issues { Vec::new() } else { issues };
        batch.commits = if refetch_commits { Vec::new() } else { commits };

        for author in &authors {
            if refetch_prs {
                let query = repo_query(repo, MERGED_PR_QUALIFIERS, Some(author.as_str()));
                let items = self.search::<IssueItem>(ISSUE_SEARCH, &query, repo).await?.into_items();
                batch.pull_requests.extend(to_pull_requests(items));
            }

            if refetch_issues {
                let query = repo_query(repo, ISSUE_QUALIFIERS, Some(author.as_str()));
                let items = self.search::<IssueItem>(ISSUE_SEARCH, &query, repo).await?.into_items();
                batch.issues.extend(to_issues(items));
            }

            if refetch_commits {
                let query = repo_query(repo, "", Some(author.as_str()));
                let items = self.search::<CommitItem>(COMMIT_SEARCH, &query, repo).await?.into_items();
                batch.commits.extend(to_commits(items));
            }
        }

        Ok(())
    }

    async fn repository_metrics(&mut self, repo: &Repository) -> Result<RepositoryMetrics, QuotaExhausted> {
        let url = format!("{}/repos/{}/{}", self.client.base_url(), repo.owner(), repo.name());
        match self.client.get_json::<RepositoryInfo>(&url, Bucket::Core).await {
            ApiResult::Success(info) => Ok(RepositoryMetrics {
                stars: info.stargazers_count,
                forks: info.forks_count,
            }),
            ApiResult::Empty => Ok(RepositoryMetrics::default()),
            ApiResult::QuotaExhausted(info) => Err(QuotaExhausted(info)),
            ApiResult::Failed(e) => {
                log::warn!(target: LOG_TARGET, "Could not fetch metadata for '{repo}': {e:#}");
                Ok(RepositoryMetrics::default())
            }
        }
    }

    async fn contributors(&mut self, repo: &Repository) -> Result<Vec<String>, QuotaExhausted> {
        let mut logins = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/repos/{}/{}/contributors?per_page={}&page={page}",
                self.client.base_url(),
                repo.owner(),
                repo.name(),
                self.page_size
            );

            match self.client.get_json::<Vec<Contributor>>(&url, Bucket::Core).await {
                ApiResult::Success(entries) => {
                    let count = entries.len();
                    logins.extend(entries.into_iter().filter_map(|c| c.login));
                    if count < self.page_size as usize {
                        break;
                    }
                }
                ApiResult::Empty => break,
                ApiResult::QuotaExhausted(info) => return Err(QuotaExhausted(info)),
                ApiResult::Failed(e) => {
                    log::warn!(
                        target: LOG_TARGET,
                        "Could not fetch contributors page {page} for '{repo}', keeping {} already gathered: {e:#}",
                        logins.len()
                    );
                    break;
                }
            }

            page += 1;
        }

        Ok(logins)
    }

    /// Page through a search, up to the configured page cap.
    async fn search<T: DeserializeOwned>(
        &mut self,
        endpoint: &str,
        query: &str,
        repo: &Repository,
    ) -> Result<SearchOutcome<T>, QuotaExhausted> {
        let mut items = Vec::new();
        let mut total_count = 0;
        let mut incomplete = false;

        for page in 1..=self.max_search_pages {
            let url = format!(
                "{}/{endpoint}?{}",
                self.client.base_url(),
                url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("q", query)
                    .append_pair("per_page", &self.page_size.to_string())
                    .append_pair("page", &page.to_string())
                    .finish()
            );

            match self.client.get_json::<SearchPage<T>>(&url, Bucket::Search).await {
                ApiResult::Success(result) => {
                    let count = result.items.len();
                    total_count = result.total_count;
                    incomplete |= result.incomplete_results;
                    items.extend(result.items);

                    if count < self.page_size as usize || items.len() as u64 >= total_count {
                        break;
                    }
                }
                ApiResult::Empty => break,
                ApiResult::QuotaExhausted(info) => return Err(QuotaExhausted(info)),
                ApiResult::Failed(e) => {
                    log::warn!(target: LOG_TARGET, "Search '{query}' failed for '{repo}', treating the category as empty: {e:#}");
                    return Ok(SearchOutcome::Failed);
                }
            }
        }

        Ok(classify(items, total_count, incomplete))
    }
}

/// Build a search query scoped to `repo`, optionally narrowed to one author.
fn repo_query(repo: &Repository, qualifiers: &str, author: Option<&str>) -> String {
    let mut query = format!("repo:{}", repo.slug());
    if !qualifiers.is_empty() {
        query.push(' ');
        query.push_str(qualifiers);
    }
    if let Some(author) = author {
        query.push_str(" author:");
        query.push_str(author);
    }
    query
}

fn to_pull_requests(items: Vec<IssueItem>) -> Vec<PullRequestActivity> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(PullRequestActivity {
                author: item.user?.login,
                created_at: item.created_at,
                closed_at: item.closed_at,
                merged_at: item.pull_request.and_then(|pr| pr.merged_at),
            })
        })
        .collect()
}

fn to_issues(items: Vec<IssueItem>) -> Vec<IssueActivity> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(IssueActivity {
                author: item.user?.login,
                created_at: item.created_at,
                is_pull_request: item.pull_request.is_some(),
            })
        })
        .collect()
}

fn to_commits(items: Vec<CommitItem>) -> Vec<CommitActivity> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(CommitActivity {
                author: item.author?.login,
                committed_at: item.commit.author.date,
            })
        })
        .collect()
}
