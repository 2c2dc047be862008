//! Command-line interface and orchestration for orgpulse
//!
//! Four commands are provided:
//!
//! - **crawl**: walk an organization through the rate-limited client, fold every
//!   repository into per-contributor records, checkpoint after each one, and
//!   write the ranked artifacts once the whole organization is covered
//! - **report**: finalize and write the artifacts from a checkpoint alone, as a
//!   preview of a crawl that has not finished yet
//! - **init**: write the default configuration file
//! - **validate**: check a configuration file
//!
//! The `common` module holds what the commands share: logging setup, the
//! checkpoint and output arguments, and configuration loading.

mod common;
mod config;
mod crawl;
mod host;
mod init;
mod progress_reporter;
mod report;
mod run;
mod validate;

#[cfg(debug_assertions)]
pub use config::Config;

pub use crawl::{CrawlArgs, crawl_organization};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use report::{ReportArgs, report_checkpoint};
pub use run::run;
pub use validate::{ValidateArgs, validate_config};
