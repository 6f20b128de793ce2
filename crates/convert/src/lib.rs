//! DICOM to NIfTI conversion ahead of identification.
//!
//! Scanners export one directory of DICOM slices per series. Before the
//! files can be identified and placed, each such directory is converted into
//! NIfTI volumes by an external program (`dcm2niix` by default):
//!
//! 1. [`DicomSet::new`] finds the series directories among the walked files,
//!    using a [`Detection`] strategy.
//! 2. [`DicomSet::convert`] runs each through a [`ConversionGate`], which
//!    skips directories already converted on a previous run.
//! 3. The resulting file list has the DICOM files replaced by the
//!    conversion outputs.

mod gate;
pub mod error;
mod process;
mod set;
mod sniff;

pub use crate::gate::{Conversion, ConversionGate};
pub use crate::process::{ConversionProcess, Dcm2niix};
pub use crate::set::{Converted, DicomSet};
pub use crate::sniff::{Detection, DicomSniffer, FileCommandSniffer, PreambleSniffer};
