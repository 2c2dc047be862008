//! Arguments and setup shared between commands.

use super::config::Config;
use crate::Result;
use crate::reports::ArtifactPaths;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};

/// Default location of the checkpoint file
pub const DEFAULT_CHECKPOINT: &str = "contributions_progress.json";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    #[must_use]
    pub fn use_colors(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    /// Whether log lines would compete with a progress bar on the terminal
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Info | Self::Debug | Self::Trace)
    }
}

/// Arguments every command that reads a checkpoint accepts
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file (default is `orgpulse.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Checkpoint file used to resume an interrupted crawl
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CHECKPOINT)]
    pub checkpoint: Utf8PathBuf,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,
}

impl CommonArgs {
    /// Initialize logging and load the configuration
    pub fn setup(&self) -> Result<Config> {
        init_logging(self.log_level);
        Config::load(Utf8Path::new("."), self.config.as_ref())
    }
}

/// Where the final artifacts are written
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Per-contributor statistics
    #[arg(long, value_name = "PATH", default_value = "contributions.json", help_heading = "Report Output")]
    pub output: Utf8PathBuf,

    /// Leaderboards per category and time window
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub hall_of_fame: Option<Utf8PathBuf>,

    /// Organization-wide totals
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub summary: Option<Utf8PathBuf>,
}

impl OutputArgs {
    #[must_use]
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            contributions: Some(self.output.clone()),
            hall_of_fame: self.hall_of_fame.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Initialize the logger; later calls in the same process keep the first logger.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_levels() {
        assert!(!LogLevel::None.is_verbose());
        assert!(!LogLevel::Warn.is_verbose());
        assert!(LogLevel::Info.is_verbose());
        assert!(LogLevel::Trace.is_verbose());
    }

    #[test]
    fn test_color_mode_explicit() {
        assert!(ColorMode::Always.use_colors());
        assert!(!ColorMode::Never.use_colors());
    }

    #[test]
    fn test_artifact_paths() {
        let args = OutputArgs {
            output: Utf8PathBuf::from("out.json"),
            hall_of_fame: None,
            summary: Some(Utf8PathBuf::from("summary.json")),
        };

        let paths = args.artifact_paths();
        assert_eq!(paths.contributions.as_deref(), Some(Utf8Path::new("out.json")));
        assert!(paths.hall_of_fame.is_none());
        assert_eq!(paths.summary.as_deref(), Some(Utf8Path::new("summary.json")));
    }
}
