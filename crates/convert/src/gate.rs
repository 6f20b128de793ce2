use crate::error::{ErrorKind, Result};
use crate::process::ConversionProcess;
use exn::{OptionExt, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Outcome of [`ConversionGate::maybe_convert`]; both carry the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The output directory already existed, so the converter wasn't run.
    Cached(PathBuf),
    Converted(PathBuf),
}
impl Conversion {
    pub fn output(&self) -> &Path {
        match self {
            Self::Cached(output) | Self::Converted(output) => output,
        }
    }
}

/// Runs a [`ConversionProcess`] at most once per source directory.
///
/// The output of `source_dir` is `output_root/<basename(source_dir)>`. The
/// existence of that directory is the cache: re-running the gate over the
/// same sources doesn't re-run the converter unless `force` is set. A failed
/// conversion removes the output directory it created, so the next run
/// retries instead of mistaking it for a finished one.
pub struct ConversionGate {
    process: Box<dyn ConversionProcess>,
    output_root: PathBuf,
    force: bool,
}
impl ConversionGate {
    pub fn new(process: impl ConversionProcess + 'static, output_root: impl Into<PathBuf>) -> Self {
        Self { process: Box::new(process), output_root: output_root.into(), force: false }
    }

    /// Re-run the converter even when the output directory exists.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Output directory that `source_dir` converts into.
    fn output_for(&self, source_dir: &Path) -> Result<PathBuf> {
        let name = source_dir.file_name().ok_or_raise(|| ErrorKind::InvalidSource(source_dir.to_path_buf()))?;
        Ok(self.output_root.join(name))
    }

    #[instrument(skip(self))]
    pub fn maybe_convert(&self, source_dir: &Path) -> Result<Conversion> {
        let output = self.output_for(source_dir)?;
        let existed = output.exists();
        if existed && !self.force {
            tracing::debug!(output = %output.display(), "Already converted");
            return Ok(Conversion::Cached(output));
        }
        fs::create_dir_all(&output).or_raise(|| ErrorKind::Io(output.clone()))?;
        if let Err(e) = self.process.convert(source_dir, &output) {
            if !existed && let Err(cleanup) = fs::remove_dir_all(&output) {
                let output = output.display();
                tracing::warn!(%output, error = %cleanup, "Could not remove failed conversion output");
            }
            return Err(e);
        }
        tracing::info!(output = %output.display(), "Converted DICOM directory");
        Ok(Conversion::Converted(output))
    }
}
