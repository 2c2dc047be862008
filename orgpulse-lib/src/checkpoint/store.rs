//! Durable in-progress crawl state.
//!
//! The checkpoint is a single JSON document, replaced atomically on every
//! save. It carries an explicit schema number so a document written by an
//! incompatible version, or damaged on disk, is rejected at load time rather
//! than merged.

use crate::Result;
use crate::github::{RawActivityBatch, Repository, RepositoryMetrics};
use crate::stats::{ContributionAggregator, Contributions, ReferenceTime, TIMESTAMP_FORMAT};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};

const LOG_TARGET: &str = "checkpoint";

/// Version of the on-disk layout
const SCHEMA: u32 = 1;

/// Accumulated state of one logical crawl.
///
/// A repository is listed in `processed_repos` exactly when its activity has
/// been folded into `all_contributions`; [`Self::absorb`] is the only way the
/// two change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    organization: String,
    reference_time: ReferenceTime,
    processed_repos: BTreeSet<String>,
    repository_metrics: BTreeMap<String, RepositoryMetrics>,
    all_contributions: Contributions,
}

impl CheckpointState {
    #[must_use]
    pub fn new(organization: impl Into<String>, reference_time: ReferenceTime) -> Self {
        Self {
            organization: organization.into(),
            reference_time,
            processed_repos: BTreeSet::new(),
            repository_metrics: BTreeMap::new(),
            all_contributions: Contributions::new(),
        }
    }

    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    #[must_use]
    pub const fn reference_time(&self) -> ReferenceTime {
        self.reference_time
    }

    #[must_use]
    pub const fn processed_repos(&self) -> &BTreeSet<String> {
        &self.processed_repos
    }

    #[must_use]
    pub const fn repository_metrics(&self) -> &BTreeMap<String, RepositoryMetrics> {
        &self.repository_metrics
    }

    #[must_use]
    pub const fn contributions(&self) -> &Contributions {
        &self.all_contributions
    }

    #[must_use]
    pub fn into_contributions(self) -> Contributions {
        self.all_contributions
    }

    #[must_use]
    pub fn is_processed(&self, repo: &Repository) -> bool {
        self.processed_repos.contains(&repo.slug())
    }

    /// Fold a repository's activity in and mark it processed, as one step.
    pub fn absorb(&mut self, batch: &RawActivityBatch, aggregator: &ContributionAggregator) {
        let slug = batch.repository.slug();
        if self.processed_repos.contains(&slug) {
            log::warn!(target: LOG_TARGET, "Repository '{slug}' was already processed, ignoring its activity");
            return;
        }

        self.all_contributions = aggregator.fold(core::mem::take(&mut self.all_contributions), batch);
        let _ = self.repository_metrics.insert(slug.clone(), batch.metrics);
        let _ = self.processed_repos.insert(slug);
    }
}

/// On-disk layout of a checkpoint
#[derive(Debug, Serialize, Deserialize)]
struct Document<T> {
    schema: u32,
    timestamp: String,
    #[serde(flatten)]
    state: T,
}

/// Result of reading the checkpoint file
#[derive(Debug)]
pub enum LoadOutcome {
    /// No checkpoint on disk
    Missing,

    /// A usable checkpoint, with the local time it was written
    Loaded { state: CheckpointState, saved_at: String },

    /// The file existed but could not be used; it was moved out of the way if possible
    Corrupt { quarantined: Option<Utf8PathBuf> },
}

/// Reads and writes the checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: Utf8PathBuf,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the checkpoint. Never fails: an unusable file is quarantined.
    #[must_use]
    pub fn load(&self) -> LoadOutcome {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "No checkpoint at '{}'", self.path);
                return LoadOutcome::Missing;
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not open checkpoint '{}': {e:#}", self.path);
                return LoadOutcome::Corrupt { quarantined: None };
            }
        };

        let document: Document<CheckpointState> = match serde_json::from_reader(BufReader::new(file)) {
            Ok(document) => document,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Checkpoint '{}' is unreadable: {e:#}", self.path);
                return LoadOutcome::Corrupt {
                    quarantined: self.quarantine(),
                };
            }
        };

        if document.schema != SCHEMA {
            log::warn!(
                target: LOG_TARGET,
                "Checkpoint '{}' uses schema {} but {SCHEMA} is required",
                self.path,
                document.schema
            );
            return LoadOutcome::Corrupt {
                quarantined: self.quarantine(),
            };
        }

        log::debug!(target: LOG_TARGET, "Loaded checkpoint '{}' saved at {}", self.path, document.timestamp);
        LoadOutcome::Loaded {
            state: document.state,
            saved_at: document.timestamp,
        }
    }

    /// Write `state`, replacing any previous checkpoint atomically.
    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        let document = Document {
            schema: SCHEMA,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            state,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
        }

        let tmp_path = self.sibling("tmp");
        let file = File::create(&tmp_path).into_app_err_with(|| format!("creating checkpoint file '{tmp_path}'"))?;
        let mut writer = BufWriter::new(file);

        #[cfg(debug_assertions)]
        let result = serde_json::to_writer_pretty(&mut writer, &document);
        #[cfg(not(debug_assertions))]
        let result = serde_json::to_writer(&mut writer, &document);

        result.into_app_err_with(|| format!("writing checkpoint file '{tmp_path}'"))?;
        writer
            .flush()
            .into_app_err_with(|| format!("flushing checkpoint file '{tmp_path}'"))?;
        drop(writer);

        fs::rename(&tmp_path, &self.path).into_app_err_with(|| format!("replacing checkpoint file '{}'", self.path))?;

        log::debug!(
            target: LOG_TARGET,
            "Saved checkpoint with {} processed repositories and {} contributors",
            state.processed_repos.len(),
            state.all_contributions.len()
        );
        Ok(())
    }

    /// Delete the checkpoint, marking the crawl as complete.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!(target: LOG_TARGET, "Removed checkpoint '{}'", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).into_app_err_with(|| format!("removing checkpoint file '{}'", self.path)),
        }
    }

    fn sibling(&self, extension: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.{extension}", self.path))
    }

    fn quarantine(&self) -> Option<Utf8PathBuf> {
        let target = self.sibling("corrupt");
        match fs::rename(&self.path, &target) {
            Ok(()) => {
                log::warn!(target: LOG_TARGET, "Moved unusable checkpoint to '{target}'");
                Some(target)
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not move unusable checkpoint '{}' aside: {e:#}", self.path);
                None
            }
        }
    }
}
