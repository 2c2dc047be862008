#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for orgpulse
//!
//! orgpulse crawls every repository of a GitHub organization, folds the pull
//! requests, issues, and commits it finds into per-contributor statistics,
//! and ranks contributors against each other. Crawls are checkpointed after
//! every repository so a run cut short by rate limits or an interrupt picks
//! up where it stopped.
//!
//! # Module Organization
//!
//! - [`github`]: Rate-limited API client and organization crawler
//! - [`stats`]: Aggregation, streaks, rankings, leaderboards, and totals
//! - [`checkpoint`]: Durable crawl state and the run lock
//! - [`pipeline`]: The resumable crawl loop
//! - [`reports`]: Writing the final JSON artifacts
//! - [`commands`]: Command-line interface and orchestration

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod checkpoint;
#[cfg(not(any(debug_assertions, test)))]
mod checkpoint;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod github;
#[cfg(not(any(debug_assertions, test)))]
mod github;

#[cfg(any(debug_assertions, test))]
pub mod pipeline;
#[cfg(not(any(debug_assertions, test)))]
mod pipeline;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

#[cfg(any(debug_assertions, test))]
pub mod stats;
#[cfg(not(any(debug_assertions, test)))]
mod stats;

pub use crate::commands::{Host, run};
