mod cli;
mod error;
mod run;

use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use rec2bids_config::Config;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level().into()))
        .with_writer(std::io::stderr)
        .init();

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "{}", *e);
            ExitCode::FAILURE
        },
    }
}

fn execute(args: &Args) -> Result<()> {
    let config = Config::load(args.config.as_deref(), &args.overrides()).or_raise(|| ErrorKind::Config)?;
    let summary = run::run(&config, !args.quiet)?;
    let report = &summary.report;
    for (path, e) in &report.failures {
        tracing::error!(path = %path.display(), error = ?e, "Not placed");
    }
    for directory in &summary.conversions_failed {
        tracing::error!(directory = %directory.display(), "Not converted");
    }
    tracing::info!(
        placed = report.placed(),
        protected = report.protected,
        skipped = report.skipped,
        duplicates = report.duplicates,
        failed = summary.failures(),
        dry_run = config.dry_run,
        "Done"
    );
    match summary.failures() {
        0 => Ok(()),
        failures => exn::bail!(ErrorKind::Incomplete(failures)),
    }
}
