//! Command-line arguments.
//!
//! Every flag is optional: anything left out falls back to the configuration
//! file, then the environment, then the built-in defaults.

use clap::{ArgAction, Parser, ValueEnum};
use rec2bids_config::{ConvertOverrides, Overrides, Sniff};
use rec2bids_library::Collisions;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the raw recordings
    pub source: Option<PathBuf>,
    /// Root of the dataset to build
    pub target: Option<PathBuf>,
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "REC2BIDS_CONFIG")]
    pub config: Option<PathBuf>,
    /// Dataset has no sessions
    #[arg(long)]
    pub no_sessions: bool,
    /// What to do when several files map to the same dataset path
    #[arg(long, value_enum)]
    pub collisions: Option<CollisionsArg>,
    /// Never overwrite an existing target whose source ends with SUFFIX
    #[arg(long = "protect", value_name = "SUFFIX")]
    pub protect: Vec<String>,
    /// Report what would be copied without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Acquisition time cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Don't cache acquisition times
    #[arg(long)]
    pub no_cache: bool,
    /// Convert DICOM directories into OUTPUT before placing
    #[arg(long = "convert", value_name = "OUTPUT")]
    pub convert_output: Option<PathBuf>,
    /// Converter executable (default: dcm2niix on PATH)
    #[arg(long, value_name = "BINARY")]
    pub converter: Option<PathBuf>,
    /// Re-convert directories that were already converted
    #[arg(long)]
    pub force: bool,
    /// How DICOM directories are recognized
    #[arg(long, value_enum)]
    pub sniff: Option<SniffArg>,
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionsArg {
    Order,
    Overwrite,
}
impl From<CollisionsArg> for Collisions {
    fn from(value: CollisionsArg) -> Self {
        match value {
            CollisionsArg::Order => Self::Order,
            CollisionsArg::Overwrite => Self::Overwrite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SniffArg {
    None,
    Preamble,
    File,
}
impl From<SniffArg> for Sniff {
    fn from(value: SniffArg) -> Self {
        match value {
            SniffArg::None => Self::None,
            SniffArg::Preamble => Self::Preamble,
            SniffArg::File => Self::File,
        }
    }
}

impl Args {
    /// Flags only override the configuration when they were given.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source.clone(),
            target: self.target.clone(),
            sessions: self.no_sessions.then_some(false),
            collisions: self.collisions.map(Into::into),
            protect: self.protect.clone(),
            dry_run: self.dry_run.then_some(true),
            cache_dir: self.cache_dir.clone(),
            no_cache: self.no_cache.then_some(true),
            convert: ConvertOverrides {
                output: self.convert_output.clone(),
                binary: self.converter.clone(),
                force: self.force.then_some(true),
                sniff: self.sniff.map(Into::into),
            },
        }
    }

    /// `info` by default, `debug` with `-v`, `trace` with `-vv`.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
