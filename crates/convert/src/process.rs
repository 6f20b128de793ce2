use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Turns one directory of DICOM files into NIfTI volumes (and sidecars)
/// inside `output`, which already exists.
///
/// Implemented for closures, which is how tests substitute the real
/// converter.
pub trait ConversionProcess {
    fn convert(&self, source: &Path, output: &Path) -> Result<()>;
}
impl<F> ConversionProcess for F
where
    F: Fn(&Path, &Path) -> Result<()>,
{
    fn convert(&self, source: &Path, output: &Path) -> Result<()> {
        self(source, output)
    }
}

/// The `dcm2niix` converter.
///
/// Run as `dcm2niix -9 -b y -o <output> <source>`: maximum compression, with
/// BIDS JSON sidecars.
#[derive(Debug, Clone)]
pub struct Dcm2niix {
    binary: PathBuf,
}
impl Dcm2niix {
    pub const EXECUTABLE: &'static str = "dcm2niix";

    /// Finds `dcm2niix` on `PATH`.
    pub fn discover() -> Result<Self> {
        match which::which(Self::EXECUTABLE) {
            Ok(binary) => {
                tracing::debug!(binary = %binary.display(), "Discovered converter");
                Ok(Self { binary })
            },
            Err(_) => exn::bail!(ErrorKind::ConverterNotFound(Self::EXECUTABLE.to_string())),
        }
    }

    /// Uses an explicitly configured executable; bare names are still looked
    /// up on `PATH`.
    pub fn with_binary(binary: impl AsRef<Path>) -> Result<Self> {
        let binary = binary.as_ref();
        let resolved = which::which(binary)
            .or_raise(|| ErrorKind::ConverterNotFound(binary.display().to_string()))?;
        Ok(Self { binary: resolved })
    }
}
impl ConversionProcess for Dcm2niix {
    #[tracing::instrument(skip(self), fields(binary = %self.binary.display()))]
    fn convert(&self, source: &Path, output: &Path) -> Result<()> {
        let result = Command::new(&self.binary)
            .args(["-9", "-b", "y", "-o"])
            .arg(output)
            .arg(source)
            .output()
            .or_raise(|| ErrorKind::Spawn(self.binary.clone()))?;
        check(&result)
    }
}

/// Maps a finished process onto the conversion outcome, logging its stderr
/// when it failed.
pub(crate) fn check(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::warn!(status = %output.status, stderr = %stderr.trim(), "Converter failed");
    match output.status.code() {
        Some(code) => exn::bail!(ErrorKind::ProcessFailed(code)),
        None => exn::bail!(ErrorKind::ProcessTerminated),
    }
}
