//! Command dispatch for orgpulse

use super::{CrawlArgs, InitArgs, ReportArgs, ValidateArgs, crawl_organization, init_config, report_checkpoint, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "orgpulse", version, author, long_about = None)]
#[command(about = "Collect and rank contribution activity across a GitHub organization")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl an organization, resuming from a checkpoint if one exists
    Crawl(Box<CrawlArgs>),
    /// Write reports from a checkpoint without crawling
    Report(Box<ReportArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        Command::Crawl(crawl_args) => crawl_organization(host, crawl_args).await,
        Command::Report(report_args) => report_checkpoint(host, report_args),
        Command::Init(init_args) => init_config(host, init_args),
        Command::Validate(validate_args) => validate_config(host, validate_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from(["orgpulse", "crawl", "--org", "acme"]);
        let Command::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };

        assert_eq!(args.org.as_deref(), Some("acme"));
        assert_eq!(args.common.checkpoint, "contributions_progress.json");
        assert_eq!(args.outputs.output, "contributions.json");
        assert!(args.outputs.hall_of_fame.is_none());
        assert!(!args.fresh);
    }

    #[test]
    fn test_report_paths() {
        let cli = Cli::parse_from([
            "orgpulse",
            "report",
            "--checkpoint",
            "state.json",
            "--summary",
            "summary.json",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };

        assert_eq!(args.common.checkpoint, "state.json");
        assert_eq!(args.outputs.summary.as_deref().map(camino::Utf8Path::as_str), Some("summary.json"));
    }
}
