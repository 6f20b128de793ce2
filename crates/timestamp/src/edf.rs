//! EyeLink EDF reader.
//!
//! EDF files open with a plain-text preamble written by the tracker; its first
//! line records when the recording started.

use crate::consts::{EDF_DATE_MARKER, EDF_DATE_REGEX, EDF_PREAMBLE_SIZE};
use crate::date;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use memchr::memmem;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use time::PrimitiveDateTime;

/// Reads the recording date from the preamble of an EyeLink EDF file.
///
/// Returns `Ok(None)` when the preamble has no `** DATE:` line.
pub fn preamble_date(path: &Path) -> Result<Option<PrimitiveDateTime>> {
    let mut head = Vec::new();
    File::open(path)
        .and_then(|file| file.take(EDF_PREAMBLE_SIZE).read_to_end(&mut head))
        .or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    preamble_date_from_bytes(path, &head)
}

pub(crate) fn preamble_date_from_bytes(path: &Path, head: &[u8]) -> Result<Option<PrimitiveDateTime>> {
    let Some(start) = memmem::find(head, EDF_DATE_MARKER) else {
        tracing::debug!(path = %path.display(), "EDF preamble has no date line");
        return Ok(None);
    };
    let line = head[start..].split(|b| *b == b'\n').next().unwrap_or_default();
    let line = String::from_utf8_lossy(line);
    match EDF_DATE_REGEX.captures(&line).and_then(|captures| date::from_captures(&captures)) {
        Some(datetime) => Ok(Some(datetime)),
        None => exn::bail!(ErrorKind::Malformed { path: path.to_path_buf(), reason: "unreadable preamble date" }),
    }
}
