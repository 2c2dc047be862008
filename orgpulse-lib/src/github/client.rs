//! Rate-limited GitHub REST client
//!
//! Every request is preceded by a `/rate_limit` status check against the
//! bucket it draws from. Exhausted buckets are waited out when the reset is
//! close enough, otherwise the request is abandoned with
//! [`ApiResult::QuotaExhausted`] so the caller can checkpoint and stop.
//! Transient failures (network errors and unexpected statuses) are retried
//! with exponential backoff by a [`seatbelt`] retry layer; quota handling
//! sits outside that layer.

use super::rate_limit::{Bucket, RateLimitBudget, RateLimitInfo, WaitDecision, compute_wait};
use crate::Result;
use chrono::Utc;
use core::time::Duration;
use layered::{Execute, Service, Stack};
use ohno::{EnrichableExt, app_err};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use serde::de::DeserializeOwned;
use tick::Clock;

const LOG_TARGET: &str = "    client";
const USER_AGENT: &str = "orgpulse";

/// Marker the upstream API puts in the body of a 403 caused by quota exhaustion
const QUOTA_EXCEEDED_MARKER: &str = "rate limit exceeded";

/// Maximum number of body characters quoted in error messages
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Upper bound on a single request attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunables of the retry and rate-limit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// A bucket with this many requests or fewer left is treated as exhausted
    pub safety_margin: u64,

    /// Attempts per request before giving up on transient failures
    pub max_retries: u32,

    /// First retry delay, doubled on every further attempt
    pub backoff_base: Duration,

    /// Longest quota wait taken before abandoning the request
    pub max_rate_limit_wait: Duration,

    /// Pause after each successful request
    pub pacing_delay: Duration,

    /// Pause when the rate-limit status itself cannot be read
    pub status_failure_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            safety_margin: 5,
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            max_rate_limit_wait: Duration::from_secs(60),
            pacing_delay: Duration::from_millis(500),
            status_failure_delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of a single logical API call
#[derive(Debug)]
pub enum ApiResult<T> {
    /// The resource was fetched
    Success(T),

    /// The resource legitimately holds no data (no content, not found, empty repository)
    Empty,

    /// The bucket cannot be replenished within the wait ceiling
    QuotaExhausted(RateLimitInfo),

    /// The request failed after all retries, or the payload was malformed
    Failed(ohno::AppError),
}

/// GitHub API client sharing one rate-limit budget across the whole run
#[derive(Debug)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    base_url: String,
    settings: ClientSettings,
    budget: RateLimitBudget,
}

impl RateLimitedClient {
    /// Create a client with an optional authentication token.
    pub fn new(token: Option<&str>, base_url: impl Into<String>, settings: ClientSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            builder = builder.default_headers(headers);
        }

        let base_url: String = base_url.into();
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            budget: RateLimitBudget::default(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The most recently observed quota for every bucket
    #[must_use]
    pub const fn budget(&self) -> RateLimitBudget {
        self.budget
    }

    /// Query `/rate_limit` and fold the answer into the budget.
    ///
    /// Returns `None` when the status cannot be read; the status endpoint
    /// itself does not count against any bucket and is never retried.
    pub async fn refresh_budget(&mut self) -> Option<RateLimitBudget> {
        let url = format!("{}/rate_limit", self.base_url);

        let resp = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                log::warn!(target: LOG_TARGET, "Could not check rate limits: HTTP {}", resp.status());
                return None;
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not check rate limits: {e:#}");
                return None;
            }
        };

        match resp.json::<RateLimitBudget>().await {
            Ok(fresh) => {
                self.budget.update(fresh);
                Some(self.budget)
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not parse rate limit status: {e:#}");
                None
            }
        }
    }

    /// Fetch `url` from `bucket` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&mut self, url: &str, bucket: Bucket) -> ApiResult<T> {
        match self.get(url, bucket).await {
            ApiResult::Success(resp) => match resp.json::<T>().await {
                Ok(value) => ApiResult::Success(value),
                Err(e) => ApiResult::Failed(ohno::AppError::from(e).enrich_with(|| format!("decoding response from '{url}'"))),
            },
            ApiResult::Empty => ApiResult::Empty,
            ApiResult::QuotaExhausted(info) => ApiResult::QuotaExhausted(info),
            ApiResult::Failed(e) => ApiResult::Failed(e),
        }
    }

    /// Issue a GET against `bucket`, waiting for quota and retrying transient failures.
    pub async fn get(&mut self, url: &str, bucket: Bucket) -> ApiResult<reqwest::Response> {
        let mut quota_rounds = 0;

        loop {
            if let Err(info) = self.ensure_quota(bucket).await {
                return ApiResult::QuotaExhausted(info);
            }

            match self.send(url).await {
                Ok(Reply::Success(resp)) => {
                    pause(self.settings.pacing_delay).await;
                    return ApiResult::Success(resp);
                }

                Ok(Reply::Empty(status)) => {
                    log::debug!(target: LOG_TARGET, "No data at '{url}' (HTTP {status})");
                    return ApiResult::Empty;
                }

                Ok(Reply::QuotaExceeded) => {
                    quota_rounds += 1;
                    if quota_rounds > self.settings.max_retries {
                        let info = self.budget.get(bucket).unwrap_or(RateLimitInfo {
                            limit: 0,
                            remaining: 0,
                            reset_at: Utc::now(),
                        });
                        log::error!(target: LOG_TARGET, "Quota for the {bucket} bucket keeps running out, giving up on '{url}'");
                        return ApiResult::QuotaExhausted(info);
                    }

                    log::warn!(target: LOG_TARGET, "Quota for the {bucket} bucket exceeded while requesting '{url}'");
                }

                Ok(Reply::Failed(status, body)) => {
                    let error = app_err!("HTTP {status}: {}", excerpt(&body));
                    log::warn!(target: LOG_TARGET, "Giving up on '{url}': {error:#}");
                    return ApiResult::Failed(error.enrich_with(|| format!("requesting '{url}'")));
                }

                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Giving up on '{url}': {e:#}");
                    return ApiResult::Failed(e.enrich_with(|| format!("requesting '{url}'")));
                }
            }
        }
    }

    /// Send one logical request through the retry and timeout layers.
    ///
    /// Returns the last attempt's reply once it is no longer transient or the
    /// attempts run out.
    async fn send(&self, url: &str) -> Result<Reply> {
        let clock = Clock::new_tokio();
        let context = ResilienceContext::new(&clock).name("github_get");

        let http = self.http.clone();
        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(|result: &Result<Reply>, _| {
                    if is_transient(result) {
                        RecoveryInfo::retry()
                    } else {
                        RecoveryInfo::never()
                    }
                })
                .max_retry_attempts(self.settings.max_retries.saturating_sub(1))
                .base_delay(self.settings.backoff_base)
                .backoff(Backoff::Exponential)
                .on_retry(|_output, args| {
                    log::debug!(
                        target: LOG_TARGET,
                        "Retrying request (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Timeout::layer("timeout", &context)
                .timeout_error(|_| app_err!("request timed out"))
                .timeout(REQUEST_TIMEOUT),
            Execute::new(move |url: String| {
                let http = http.clone();
                async move { fetch(&http, &url).await }
            }),
        )
            .into_service();

        service.execute(url.to_string()).await
    }

    /// Make sure `bucket` has quota, sleeping until its reset when that is close enough.
    ///
    /// Returns the bucket state as the error when the wait would exceed the ceiling.
    async fn ensure_quota(&mut self, bucket: Bucket) -> core::result::Result<(), RateLimitInfo> {
        let Some(info) = self.refresh_budget().await.and_then(|budget| budget.get(bucket)) else {
            log::debug!(
                target: LOG_TARGET,
                "Rate limit status for the {bucket} bucket unavailable, proceeding after {:?}",
                self.settings.status_failure_delay
            );
            pause(self.settings.status_failure_delay).await;
            return Ok(());
        };

        match compute_wait(&info, Utc::now(), self.settings.safety_margin, self.settings.max_rate_limit_wait) {
            WaitDecision::Proceed => Ok(()),
            WaitDecision::Wait(wait) => {
                log::info!(target: LOG_TARGET, "Quota for the {bucket} bucket almost exhausted ({info}), waiting {}s", wait.as_secs());
                pause(wait).await;
                Ok(())
            }
            WaitDecision::Abort(wait) => {
                log::error!(
                    target: LOG_TARGET,
                    "Quota for the {bucket} bucket exhausted ({info}), a {}s wait exceeds the {}s ceiling",
                    wait.as_secs(),
                    self.settings.max_rate_limit_wait.as_secs()
                );
                Err(info)
            }
        }
    }
}

/// What a single attempt got back from the server
#[derive(Debug)]
enum Reply {
    Success(reqwest::Response),

    /// A status meaning the resource holds nothing
    Empty(StatusCode),

    /// A 403 whose body reports the rate limit as exceeded
    QuotaExceeded,

    /// Any other status, with the response body
    Failed(StatusCode, String),
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<Reply> {
    let resp = http.get(url).send().await?;
    let status = resp.status();

    if status == StatusCode::OK {
        return Ok(Reply::Success(resp));
    }

    if is_empty_status(status) {
        return Ok(Reply::Empty(status));
    }

    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::FORBIDDEN && is_quota_exceeded(&body) {
        Ok(Reply::QuotaExceeded)
    } else {
        Ok(Reply::Failed(status, body))
    }
}

/// Network errors and unexpected statuses are worth another attempt; quota
/// exhaustion is handled by the caller against the budget instead.
fn is_transient(result: &Result<Reply>) -> bool {
    matches!(result, Err(_) | Ok(Reply::Failed(..)))
}

/// Statuses that mean the resource holds nothing, as opposed to a failure.
fn is_empty_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_FOUND | StatusCode::CONFLICT)
}

fn is_quota_exceeded(body: &str) -> bool {
    body.to_lowercase().contains(QUOTA_EXCEEDED_MARKER)
}

fn excerpt(body: &str) -> String {
    let mut text: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        text.push_str("...");
    }
    text
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
