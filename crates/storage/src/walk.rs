//! Depth-first listing of the source tree.
//!
//! Raw recordings are always read from the local filesystem, whatever backend
//! the dataset is written to, so walking is a plain blocking iterator over
//! absolute paths rather than a backend operation.

use crate::error::{ErrorKind, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// Iterator returned by [`walk`].
pub struct Walk {
    /// Directories still to be read.
    stack: Vec<PathBuf>,
    /// Files (and errors) found in the directory read last.
    ready: VecDeque<Result<PathBuf>>,
}

/// Lists every regular file under `root`.
///
/// Entries of each directory are visited in name order, files before
/// subdirectories, so the same tree always yields the same sequence. Symbolic
/// links to files are followed; symbolic links to directories are not.
/// Unreadable entries are yielded as errors without ending the walk. A
/// missing `root` yields nothing.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// std::fs::create_dir(dir.path().join("S1"))?;
/// std::fs::write(dir.path().join("S1/S1_P1_B1.mat"), b"")?;
/// std::fs::write(dir.path().join("notes.txt"), b"")?;
///
/// let files: Vec<_> = rec2bids_storage::walk(dir.path()).collect::<Result<_, _>>().unwrap();
/// assert_eq!(files, [dir.path().join("notes.txt"), dir.path().join("S1/S1_P1_B1.mat")]);
/// # Ok(())
/// # }
/// ```
pub fn walk(root: impl AsRef<Path>) -> Walk {
    Walk { stack: vec![root.as_ref().to_path_buf()], ready: VecDeque::new() }
}

impl Walk {
    fn read_dir(&mut self, directory: &Path) {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                self.ready.push_back(Err(ErrorKind::from_io(e, directory).into()));
                return;
            },
        };
        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => self.ready.push_back(Err(ErrorKind::from_io(e, directory).into())),
            }
        }
        paths.sort();
        let mut subdirectories = Vec::new();
        for path in paths {
            match Self::classify(path) {
                Ok(WalkEntry::File(file)) => self.ready.push_back(Ok(file)),
                Ok(WalkEntry::Descend(subdirectory)) => subdirectories.push(subdirectory),
                Ok(WalkEntry::Skip) => {},
                Err(e) => self.ready.push_back(Err(e)),
            }
        }
        // Reversed so that the first subdirectory is popped first.
        self.stack.extend(subdirectories.into_iter().rev());
    }

    fn classify(path: PathBuf) -> Result<WalkEntry> {
        let link = fs::symlink_metadata(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        if link.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(WalkEntry::File(path)),
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Not following link to directory or special file");
                Ok(WalkEntry::Skip)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Skipping broken symbolic link");
                Ok(WalkEntry::Skip)
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        }
    }
}
impl Iterator for Walk {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return Some(next);
            }
            let directory = self.stack.pop()?;
            self.read_dir(&directory);
        }
    }
}
