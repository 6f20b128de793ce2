use crate::error::{Error, ErrorKind};
use crate::gate::{Conversion, ConversionGate};
use crate::sniff::Detection;
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// The source file list, partitioned into DICOM series directories and
/// everything else.
#[derive(Debug, Clone)]
pub struct DicomSet {
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
}

/// The file list after conversion.
#[derive(Debug, Default)]
pub struct Converted {
    /// Every source file outside the converted directories, in the original
    /// order, followed by the files of each conversion output.
    pub files: Vec<PathBuf>,
    pub converted: usize,
    pub cached: usize,
    /// Directories whose conversion failed. Their files stay in
    /// [`files`](Self::files) untouched.
    pub failures: Vec<(PathBuf, Error)>,
}

impl DicomSet {
    /// Finds the directories (among the parents of `files`) that `detection`
    /// accepts. Directories that can't be inspected are logged and left
    /// alone.
    #[instrument(skip_all)]
    pub fn new(files: impl IntoIterator<Item = PathBuf>, detection: &Detection) -> Self {
        let files: Vec<PathBuf> = files.into_iter().collect();
        let mut seen = HashSet::new();
        let mut directories = Vec::new();
        for parent in files.iter().filter_map(|file| file.parent()) {
            if !seen.insert(parent) {
                continue;
            }
            match detection.is_dicom_dir(parent) {
                Ok(true) => directories.push(parent.to_path_buf()),
                Ok(false) => {},
                Err(e) => tracing::warn!(directory = %parent.display(), error = %*e, "Cannot inspect directory"),
            }
        }
        tracing::info!(directories = directories.len(), "DICOM directories found");
        Self { files, directories }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Converts every DICOM directory through `gate` and swaps its files for
    /// the conversion output.
    ///
    /// Outputs are named after the directory, so only the first of several
    /// directories sharing a name is converted. The others fail with
    /// [`SharedOutput`](ErrorKind::SharedOutput) and keep their files.
    pub fn convert(self, gate: &ConversionGate) -> Converted {
        let mut result = Converted::default();
        let mut replaced = HashSet::new();
        let mut outputs = Vec::new();
        let mut names: HashMap<&OsStr, &Path> = HashMap::new();
        for directory in &self.directories {
            if let Some(name) = directory.file_name() {
                let first = *names.entry(name).or_insert(directory.as_path());
                if first != directory.as_path() {
                    let (shown, shown_first) = (directory.display(), first.display());
                    tracing::warn!(directory = %shown, first = %shown_first, "DICOM directories share a name");
                    let e = exn::Exn::from(ErrorKind::SharedOutput(first.to_path_buf()));
                    result.failures.push((directory.clone(), e));
                    continue;
                }
            }
            match gate.maybe_convert(directory) {
                Ok(conversion) => {
                    match conversion {
                        Conversion::Cached(_) => result.cached += 1,
                        Conversion::Converted(_) => result.converted += 1,
                    }
                    replaced.insert(directory.as_path());
                    outputs.extend(list_output(conversion.output()));
                },
                Err(e) => {
                    tracing::warn!(directory = %directory.display(), error = %*e, "DICOM conversion failed");
                    result.failures.push((directory.clone(), e));
                },
            }
        }
        result.files = self
            .files
            .iter()
            .filter(|file| !file.parent().is_some_and(|parent| replaced.contains(parent)))
            .cloned()
            .chain(outputs)
            .collect();
        result
    }
}

fn list_output(output: &Path) -> Vec<PathBuf> {
    rec2bids_storage::walk(output)
        .filter_map(|file| match file {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(output = %output.display(), error = %*e, "Cannot list conversion output");
                None
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Result};
    use crate::sniff::PreambleSniffer;
    use crate::sniff::tests::dicom;
    use exn::ResultExt;
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;

    /// raw/S1/series1/IM000{1,2}, raw/S1/series2/IM0001, raw/S1/S1_P1_B1.mat
    fn layout(root: &Path) -> Vec<PathBuf> {
        for series in ["series1", "series2"] {
            fs::create_dir_all(root.join("raw/S1").join(series)).unwrap();
        }
        dicom(&root.join("raw/S1/series1/IM0001"));
        dicom(&root.join("raw/S1/series1/IM0002"));
        dicom(&root.join("raw/S1/series2/IM0001"));
        fs::write(root.join("raw/S1/S1_P1_B1.mat"), b"MATLAB").unwrap();
        rec2bids_storage::walk(root.join("raw")).map(|f| f.unwrap()).collect()
    }

    fn gate(root: &Path, calls: &Rc<Cell<usize>>) -> ConversionGate {
        let calls = Rc::clone(calls);
        let process = move |source: &Path, output: &Path| -> Result<()> {
            calls.set(calls.get() + 1);
            let name = source.file_name().unwrap().to_string_lossy();
            for extension in ["nii.gz", "json"] {
                let path = output.join(format!("{name}.{extension}"));
                fs::write(&path, b"converted").or_raise(|| ErrorKind::Io(path.clone()))?;
            }
            Ok(())
        };
        ConversionGate::new(process, root.join("converted"))
    }

    #[test]
    fn test_finds_dicom_directories() {
        let dir = tempfile::tempdir().unwrap();
        let files = layout(dir.path());
        let set = DicomSet::new(files, &Detection::sniff(PreambleSniffer));
        assert_eq!(
            set.directories(),
            [dir.path().join("raw/S1/series1"), dir.path().join("raw/S1/series2")]
        );
    }

    #[test]
    fn test_swaps_dicom_files_for_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let gate = gate(dir.path(), &calls);
        let set = DicomSet::new(layout(dir.path()), &Detection::sniff(PreambleSniffer));

        let converted = set.clone().convert(&gate);
        assert_eq!((converted.converted, converted.cached), (2, 0));
        assert!(converted.failures.is_empty());
        let converted_root = dir.path().join("converted");
        assert_eq!(
            converted.files,
            [
                dir.path().join("raw/S1/S1_P1_B1.mat"),
                converted_root.join("series1/series1.json"),
                converted_root.join("series1/series1.nii.gz"),
                converted_root.join("series2/series2.json"),
                converted_root.join("series2/series2.nii.gz"),
            ]
        );

        // Second run: same list, no new conversions.
        let again = set.convert(&gate);
        assert_eq!((again.converted, again.cached), (0, 2));
        assert_eq!(again.files, converted.files);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failed_directories_keep_their_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = layout(dir.path());
        let failing = |source: &Path, _: &Path| -> Result<()> {
            match source.ends_with("series2") {
                true => exn::bail!(ErrorKind::ProcessFailed(1)),
                false => Ok(()),
            }
        };
        let gate = ConversionGate::new(failing, dir.path().join("converted"));
        let converted = DicomSet::new(files, &Detection::sniff(PreambleSniffer)).convert(&gate);
        assert_eq!(converted.failures.len(), 1);
        assert_eq!(converted.failures[0].0, dir.path().join("raw/S1/series2"));
        assert_eq!(*converted.failures[0].1, ErrorKind::ProcessFailed(1));
        assert!(converted.files.contains(&dir.path().join("raw/S1/series2/IM0001")));
        assert!(!converted.files.contains(&dir.path().join("raw/S1/series1/IM0001")));
    }

    #[test]
    fn test_directories_sharing_a_name_are_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        for subject in ["sub1", "sub2"] {
            fs::create_dir_all(dir.path().join("raw").join(subject).join("T1")).unwrap();
            dicom(&dir.path().join("raw").join(subject).join("T1/IM0001"));
        }
        let files: Vec<PathBuf> = rec2bids_storage::walk(dir.path().join("raw")).map(|f| f.unwrap()).collect();
        let calls = Rc::new(Cell::new(0));
        let gate = gate(dir.path(), &calls);

        let converted = DicomSet::new(files, &Detection::sniff(PreambleSniffer)).convert(&gate);
        assert_eq!((converted.converted, converted.cached, calls.get()), (1, 0, 1));
        assert_eq!(converted.failures.len(), 1);
        assert_eq!(converted.failures[0].0, dir.path().join("raw/sub2/T1"));
        assert_eq!(*converted.failures[0].1, ErrorKind::SharedOutput(dir.path().join("raw/sub1/T1")));
        assert_eq!(
            converted.files,
            [
                dir.path().join("raw/sub2/T1/IM0001"),
                dir.path().join("converted/T1/T1.json"),
                dir.path().join("converted/T1/T1.nii.gz"),
            ]
        );
    }

    #[test]
    fn test_leaf_detection_takes_every_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let files = layout(dir.path());
        let set = DicomSet::new(files, &Detection::Leaf);
        // raw/S1 has subdirectories, so only the two series qualify.
        assert_eq!(set.directories().len(), 2);
    }
}
