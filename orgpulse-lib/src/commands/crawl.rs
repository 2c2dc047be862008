use super::Host;
use super::ProgressReporter;
use super::common::{ColorMode, CommonArgs, OutputArgs};
use crate::Result;
use crate::checkpoint::CheckpointStore;
use crate::github::{OrganizationCrawler, RateLimitedClient};
use crate::pipeline::{CrawlOutcome, Pipeline};
use crate::reports::write_artifacts;
use crate::stats::compile;
use chrono::Utc;
use clap::Parser;
use core::time::Duration;
use ohno::app_err;
use std::io::Write;

const LOG_TARGET: &str = "     crawl";

/// How long the progress bar stays hidden for quiet log levels
const PROGRESS_DELAY: Duration = Duration::from_millis(300);

/// Effectively never, for log levels that already narrate the crawl
const PROGRESS_NEVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Parser, Debug)]
pub struct CrawlArgs {
    /// GitHub organization to crawl
    #[arg(long, value_name = "ORG", env = "ORG_NAME")]
    pub org: Option<String>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Discard any existing checkpoint and start a new crawl
    #[arg(long)]
    pub fresh: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub outputs: OutputArgs,
}

/// Crawl an organization, resuming from the checkpoint when one exists.
///
/// The artifacts are written and the checkpoint removed only once every
/// repository has been processed.
pub async fn crawl_organization<H: Host>(host: &mut H, args: &CrawlArgs) -> Result<()> {
    let config = args.common.setup()?;

    let org = args
        .org
        .as_deref()
        .map(str::trim)
        .filter(|org| !org.is_empty())
        .ok_or_else(|| app_err!("no organization given, use --org or set ORG_NAME"))?;

    let token = args
        .github_token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| app_err!("no GitHub token given, use --github-token or set GITHUB_TOKEN"))?;

    let client = RateLimitedClient::new(Some(token), &config.api_url, config.client_settings())?;
    let crawler = OrganizationCrawler::new(client, config.page_size, config.max_search_pages);

    let delay = if args.common.log_level.is_verbose() {
        PROGRESS_NEVER
    } else {
        PROGRESS_DELAY
    };
    let progress = ProgressReporter::new(delay, args.color.use_colors());

    let mut pipeline = Pipeline::new(crawler, CheckpointStore::new(args.common.checkpoint.clone()), &progress);
    let outcome = pipeline.crawl(org, args.fresh, interrupted()).await?;

    match outcome {
        CrawlOutcome::Complete(state) => {
            let repositories = state.repository_metrics().clone();
            let reference = state.reference_time();
            let records = compile(state.into_contributions(), reference);

            write_artifacts(
                &args.outputs.artifact_paths(),
                &records,
                &repositories,
                config.hall_of_fame_size,
                Utc::now(),
            )?;
            pipeline.store().clear()?;

            let _ = writeln!(
                host.output(),
                "Processed {} repositories of '{org}': {} contributors written to '{}'",
                repositories.len(),
                records.len(),
                args.outputs.output
            );
        }

        CrawlOutcome::Stopped { reason, processed, total } => {
            let total = total.map_or_else(|| "?".to_string(), |total| total.to_string());
            let _ = writeln!(
                host.error(),
                "Crawl stopped ({reason}): {processed}/{total} repositories processed, rerun to continue"
            );
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!(target: LOG_TARGET, "Could not listen for Ctrl-C: {e:#}");
        core::future::pending::<()>().await;
    }
}
