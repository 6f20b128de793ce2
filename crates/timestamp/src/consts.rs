use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Experiment `start_time` as written by the stimulus scripts, with or without
/// colons in the time: `08-Mar-17-14:02:11` and `08-Mar-17-140211`.
regex!(
    MAT_START_TIME_REGEX,
    r"(?P<day>\d{2})-(?P<month>[A-Za-z]{3})-(?P<year>\d{2})-(?P<hour>\d{2}):?(?P<minute>\d{2}):?(?P<second>\d{2})"
);
/// EyeLink preamble line: `** DATE: Wed Mar  8  14:02:11 2017`.
regex!(
    EDF_DATE_REGEX,
    r"\*\* DATE:\s+[A-Za-z]{3}\s+(?P<month>[A-Za-z]{3})\s+(?P<day>\d{1,2})\s+(?P<hour>\d{1,2}):(?P<minute>\d{2}):(?P<second>\d{2})\s+(?P<year>\d{4})"
);

pub(crate) const MAT_HEADER_SIZE: usize = 128;
pub(crate) const MAT_HEADER_TEXT: &[u8] = b"MATLAB 5.0 MAT-file";
// Data element types.
pub(crate) const MI_INT8: u32 = 1;
pub(crate) const MI_UINT8: u32 = 2;
pub(crate) const MI_UINT16: u32 = 4;
pub(crate) const MI_MATRIX: u32 = 14;
pub(crate) const MI_COMPRESSED: u32 = 15;
pub(crate) const MI_UTF8: u32 = 16;
pub(crate) const MI_UTF16: u32 = 17;
// Array classes, the low byte of the array flags.
pub(crate) const MX_STRUCT: u8 = 2;
pub(crate) const MX_CHAR: u8 = 4;
pub(crate) const START_TIME_FIELD: &[u8] = b"start_time";
/// The EDF preamble is a handful of text lines; the date is on the first.
pub(crate) const EDF_PREAMBLE_SIZE: u64 = 4096;
pub(crate) const EDF_DATE_MARKER: &[u8] = b"** DATE:";
