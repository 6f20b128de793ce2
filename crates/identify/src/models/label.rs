//! Entity label normalization.
//!
//! Subject and session labels always carry their reserved prefix once
//! normalized. Normalization is idempotent: `"01"`, `"sub-01"` and
//! `" sub-01 "` all become `"sub-01"`.

/// Reserved prefix for subject labels.
pub const SUBJECT_PREFIX: &str = "sub-";
/// Reserved prefix for session labels.
pub const SESSION_PREFIX: &str = "ses-";

/// Normalizes a subject label so that it begins with [`SUBJECT_PREFIX`].
///
/// ```
/// use rec2bids_identify::models::normalize_subject;
/// assert_eq!(normalize_subject("01"), "sub-01");
/// assert_eq!(normalize_subject("sub-01"), "sub-01");
/// ```
pub fn normalize_subject(label: impl AsRef<str>) -> String {
    prefixed(SUBJECT_PREFIX, label.as_ref())
}

/// Normalizes a session label so that it begins with [`SESSION_PREFIX`].
pub fn normalize_session(label: impl AsRef<str>) -> String {
    prefixed(SESSION_PREFIX, label.as_ref())
}

fn prefixed(prefix: &str, label: &str) -> String {
    let label = label.trim();
    match label.starts_with(prefix) {
        true => label.to_string(),
        false => format!("{prefix}{label}"),
    }
}

/// Returns the normalized label, or `None` when there is nothing left once
/// whitespace and the prefix are accounted for.
pub(crate) fn present(label: Option<&str>, prefix: &str) -> Option<String> {
    let label = prefixed(prefix, label?);
    (label.len() > prefix.len()).then_some(label)
}

/// Trims an optional free-form label, treating blank values as absent.
pub(crate) fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
