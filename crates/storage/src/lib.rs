//! Where the dataset's files come from and where they go.
//!
//! - [`walk`] lists the raw recordings under a source directory.
//! - [`StorageBackend`] writes the reorganized dataset: to disk with
//!   [`LocalBackend`](backend::LocalBackend), nowhere with
//!   [`DryRunBackend`](backend::DryRunBackend).
//! - [`validate_path`] keeps every generated path inside the dataset root.

pub mod backend;
pub mod error;
mod path;
mod walk;

pub use crate::backend::StorageBackend;
pub use crate::path::validate as validate_path;
pub use crate::walk::{Walk, walk};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
