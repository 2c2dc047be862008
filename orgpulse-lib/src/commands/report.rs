use super::Host;
use super::common::{CommonArgs, OutputArgs};
use crate::Result;
use crate::checkpoint::{CheckpointStore, LoadOutcome};
use crate::reports::write_artifacts;
use crate::stats::compile;
use chrono::Utc;
use clap::Parser;
use ohno::bail;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub outputs: OutputArgs,
}

/// Write the artifacts for whatever a checkpoint holds, without crawling.
///
/// The checkpoint is left in place so the crawl can still be resumed.
pub fn report_checkpoint<H: Host>(host: &mut H, args: &ReportArgs) -> Result<()> {
    let config = args.common.setup()?;
    let store = CheckpointStore::new(args.common.checkpoint.clone());

    let (state, saved_at) = match store.load() {
        LoadOutcome::Loaded { state, saved_at } => (state, saved_at),
        LoadOutcome::Missing => bail!("no checkpoint found at '{}'", store.path()),
        LoadOutcome::Corrupt { .. } => bail!("checkpoint at '{}' could not be read", store.path()),
    };

    let organization = state.organization().to_string();
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

    let _ = writeln!(
        host.output(),
        "Reported {} contributors from {} repositories of '{organization}' (checkpoint saved at {saved_at})",
        records.len(),
        repositories.len()
    );

    Ok(())
}
