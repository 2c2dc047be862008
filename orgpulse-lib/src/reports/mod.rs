//! Writing the published artifacts of a crawl.
//!
//! Three JSON documents are produced from the final, ranked records:
//! - **contributions**: every contributor's full record, keyed by username
//! - **hall of fame**: per-category, per-window leaderboards
//! - **summary**: organization-wide totals
//!
//! Each generator renders into a `core::fmt::Write`; [`write_artifacts`]
//! takes care of placing the documents on disk.

mod contributions;
mod hall_of_fame;
mod summary;

pub use contributions::generate as generate_contributions;
pub use hall_of_fame::generate as generate_hall_of_fame;
pub use summary::generate as generate_summary;

use crate::Result;
use crate::github::RepositoryMetrics;
use crate::stats::{Contributions, hall_of_fame, summarize};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = "   reports";

/// Where each artifact goes; `None` skips it
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub contributions: Option<Utf8PathBuf>,
    pub hall_of_fame: Option<Utf8PathBuf>,
    pub summary: Option<Utf8PathBuf>,
}

/// Render and write every requested artifact for the ranked `records`.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    records: &Contributions,
    repositories: &BTreeMap<String, RepositoryMetrics>,
    hall_of_fame_size: usize,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    if let Some(path) = &paths.contributions {
        let mut text = String::new();
        generate_contributions(records, &mut text)?;
        write_file(path, &text)?;
    }

    if let Some(path) = &paths.hall_of_fame {
        let mut text = String::new();
        generate_hall_of_fame(&hall_of_fame(records, hall_of_fame_size, generated_at), &mut text)?;
        write_file(path, &text)?;
    }

    if let Some(path) = &paths.summary {
        let mut text = String::new();
        generate_summary(&summarize(records, repositories, generated_at), &mut text)?;
        write_file(path, &text)?;
    }

    Ok(())
}

fn write_file(path: &Utf8Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
    }

    fs::write(path, text).into_app_err_with(|| format!("writing '{path}'"))?;
    log::info!(target: LOG_TARGET, "Wrote '{path}'");
    Ok(())
}
