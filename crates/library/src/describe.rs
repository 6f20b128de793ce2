use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rec2bids_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DESCRIPTION_FILE: &str = "dataset_description.json";
pub const BIDS_VERSION: &str = "1.8.0";

/// The `dataset_description.json` written at the dataset root.
///
/// Keys follow the BIDS names (`Name`, `BIDSVersion`, ...) and absent fields
/// are left out of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetDescription {
    pub name: String,
    #[serde(rename = "BIDSVersion", default = "bids_version")]
    pub bids_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_acknowledge: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funding: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references_and_links: Vec<String>,
    #[serde(rename = "DatasetDOI", default, skip_serializing_if = "Option::is_none")]
    pub dataset_doi: Option<String>,
}

fn bids_version() -> String {
    BIDS_VERSION.to_string()
}

impl DatasetDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bids_version: bids_version(),
            license: None,
            authors: Vec::new(),
            acknowledgements: None,
            how_to_acknowledge: None,
            funding: Vec::new(),
            references_and_links: Vec::new(),
            dataset_doi: None,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Description)
    }

    /// Writes the description to [`DESCRIPTION_FILE`] at the root of
    /// `backend`, replacing any previous one.
    pub fn write(&self, backend: &dyn StorageBackend) -> Result<()> {
        backend.write(Path::new(DESCRIPTION_FILE), &self.to_json()?).or_raise(|| ErrorKind::Description)?;
        tracing::info!(name = %self.name, "Wrote dataset description");
        Ok(())
    }
}
