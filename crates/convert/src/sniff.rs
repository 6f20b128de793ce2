//! Deciding which directories hold a DICOM series.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Offset of the `DICM` magic, after the 128-byte preamble.
const PREAMBLE_SIZE: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Recognizes DICOM files.
pub trait DicomSniffer {
    fn is_dicom(&self, path: &Path) -> Result<bool>;
}

/// Checks for the `DICM` magic at byte offset 128 (DICOM Part 10 files).
#[derive(Debug, Clone, Copy, Default)]
pub struct PreambleSniffer;
impl DicomSniffer for PreambleSniffer {
    fn is_dicom(&self, path: &Path) -> Result<bool> {
        let mut head = Vec::with_capacity(PREAMBLE_SIZE + MAGIC.len());
        File::open(path)
            .and_then(|file| file.take((PREAMBLE_SIZE + MAGIC.len()) as u64).read_to_end(&mut head))
            .or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        Ok(head.get(PREAMBLE_SIZE..) == Some(MAGIC.as_slice()))
    }
}

/// Asks the `file(1)` utility, which also knows older, preamble-less DICOM
/// files.
#[derive(Debug, Clone)]
pub struct FileCommandSniffer {
    binary: PathBuf,
}
impl FileCommandSniffer {
    pub fn discover() -> Result<Self> {
        Self::with_binary("file")
    }

    pub fn with_binary(binary: impl AsRef<Path>) -> Result<Self> {
        let binary = binary.as_ref();
        let resolved = which::which(binary).or_raise(|| ErrorKind::ConverterNotFound(binary.display().to_string()))?;
        Ok(Self { binary: resolved })
    }
}
impl DicomSniffer for FileCommandSniffer {
    fn is_dicom(&self, path: &Path) -> Result<bool> {
        let output = Command::new(&self.binary)
            .arg("--brief")
            .arg(path)
            .output()
            .or_raise(|| ErrorKind::Spawn(self.binary.clone()))?;
        crate::process::check(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout).contains("DICOM"))
    }
}

/// How [`DicomSet`](crate::DicomSet) picks the directories to convert.
pub enum Detection {
    /// Every directory without subdirectories qualifies.
    Leaf,
    /// A directory qualifies when it holds at least one file and the sniffer
    /// recognizes every file directly inside it.
    Sniff(Box<dyn DicomSniffer>),
}
impl Detection {
    pub fn sniff(sniffer: impl DicomSniffer + 'static) -> Self {
        Self::Sniff(Box::new(sniffer))
    }

    pub fn is_dicom_dir(&self, directory: &Path) -> Result<bool> {
        let io = || ErrorKind::Io(directory.to_path_buf());
        let mut files = Vec::new();
        for entry in fs::read_dir(directory).or_raise(io)? {
            let path = entry.or_raise(io)?.path();
            match path.is_dir() {
                true if matches!(self, Self::Leaf) => return Ok(false),
                true => {},
                false => files.push(path),
            }
        }
        match self {
            Self::Leaf => Ok(true),
            Self::Sniff(sniffer) => {
                if files.is_empty() {
                    return Ok(false);
                }
                for file in files {
                    if !sniffer.is_dicom(&file)? {
                        tracing::trace!(file = %file.display(), "Not a DICOM file");
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        }
    }
}
