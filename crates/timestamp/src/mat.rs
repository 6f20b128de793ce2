//! MATLAB v5 MAT-file reader.
//!
//! Only as much of the format is understood as is needed to find the
//! experiment's `start_time`: the 128-byte header (for the byte order), the
//! data element tags, and the layout of struct and char arrays. Top-level
//! variables are read in order (compressed ones inflated first). The date is
//! taken from a char variable named `start_time`, or from the `start_time`
//! field of a struct variable, looking into nested structs when the field
//! isn't on the struct itself. Only the first element of struct arrays is
//! read.

use crate::consts::{
    MAT_HEADER_SIZE, MAT_HEADER_TEXT, MAT_START_TIME_REGEX, MI_COMPRESSED, MI_INT8, MI_MATRIX, MI_UINT8, MI_UINT16,
    MI_UTF8, MI_UTF16, MX_CHAR, MX_STRUCT, START_TIME_FIELD,
};
use crate::date;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use flate2::read::ZlibDecoder;
use std::io::Read;
use std::path::Path;
use time::PrimitiveDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}
impl Endian {
    fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(bytes),
            Self::Big => u16::from_be_bytes(bytes),
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        }
    }
}

/// Reads the `start_time` of the experiment saved in a MAT-file.
///
/// Returns `Ok(None)` for a well-formed file that simply doesn't contain one.
pub fn start_time(path: &Path) -> Result<Option<PrimitiveDateTime>> {
    let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    start_time_from_bytes(path, &bytes)
}

pub(crate) fn start_time_from_bytes(path: &Path, bytes: &[u8]) -> Result<Option<PrimitiveDateTime>> {
    let malformed = |reason| ErrorKind::Malformed { path: path.to_path_buf(), reason };
    if bytes.len() < MAT_HEADER_SIZE || !bytes.starts_with(MAT_HEADER_TEXT) {
        exn::bail!(malformed("not a MATLAB 5.0 MAT-file"));
    }
    let endian = match &bytes[126..128] {
        b"IM" => Endian::Little,
        b"MI" => Endian::Big,
        _ => exn::bail!(malformed("unknown byte order indicator")),
    };

    let mut variables = Cursor::new(path, endian, &bytes[MAT_HEADER_SIZE..]);
    while let Some(element) = variables.next()? {
        let found = match element.kind {
            MI_MATRIX => variable_start_time(variables.child(element.data))?,
            MI_COMPRESSED => {
                let mut inflated = Vec::new();
                ZlibDecoder::new(element.data)
                    .read_to_end(&mut inflated)
                    .or_raise(|| malformed("corrupt compressed data element"))?;
                let mut inner = variables.child(&inflated);
                match inner.next()? {
                    Some(variable) if variable.kind == MI_MATRIX => variable_start_time(inner.child(variable.data))?,
                    _ => None,
                }
            },
            _ => None,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    tracing::debug!(path = %path.display(), "MAT-file has no start_time");
    Ok(None)
}

fn variable_start_time(body: Cursor<'_>) -> Result<Option<PrimitiveDateTime>> {
    Matrix::parse(body)?.map_or(Ok(None), Matrix::start_time)
}

fn parse(text: &str) -> Option<PrimitiveDateTime> {
    MAT_START_TIME_REGEX.captures(text).and_then(|captures| date::from_captures(&captures))
}

fn word(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    word
}

struct Element<'a> {
    kind: u32,
    data: &'a [u8],
}

/// Walks the data elements of one level of a MAT-file.
#[derive(Clone, Copy)]
struct Cursor<'a> {
    path: &'a Path,
    endian: Endian,
    bytes: &'a [u8],
    offset: usize,
}
impl<'a> Cursor<'a> {
    fn new(path: &'a Path, endian: Endian, bytes: &'a [u8]) -> Self {
        Self { path, endian, bytes, offset: 0 }
    }

    /// A cursor over the payload of an element of this one.
    fn child<'b>(&self, bytes: &'b [u8]) -> Cursor<'b>
    where
        'a: 'b,
    {
        Cursor::new(self.path, self.endian, bytes)
    }

    fn malformed(&self, reason: &'static str) -> ErrorKind {
        ErrorKind::Malformed { path: self.path.to_path_buf(), reason }
    }

    fn next(&mut self) -> Result<Option<Element<'a>>> {
        let bytes = self.bytes;
        if self.offset + 8 > bytes.len() {
            return Ok(None);
        }
        let tag = self.endian.u32(word(bytes, self.offset));
        // Small data element: the size is in the upper half of the tag and
        // the data in the following four bytes.
        let small = (tag >> 16) as usize;
        if small != 0 {
            if small > 4 {
                exn::bail!(self.malformed("oversized small data element"));
            }
            let start = self.offset + 4;
            self.offset += 8;
            return Ok(Some(Element { kind: tag & 0xFFFF, data: &bytes[start..start + small] }));
        }
        let size = self.endian.u32(word(bytes, self.offset + 4)) as usize;
        let start = self.offset + 8;
        let end = start
            .checked_add(size)
            .filter(|end| *end <= bytes.len())
            .ok_or_raise(|| self.malformed("truncated data element"))?;
        // Compressed elements aren't padded; everything else is aligned to 8 bytes.
        self.offset = match tag {
            MI_COMPRESSED => end,
            _ => start + size.next_multiple_of(8),
        };
        Ok(Some(Element { kind: tag, data: &bytes[start..end] }))
    }

    fn expect(&mut self) -> Result<Element<'a>> {
        let next = self.next()?;
        next.ok_or_raise(|| self.malformed("missing array sub-element"))
    }
}

/// A parsed `miMATRIX` header; `body` is left at the class-specific part.
struct Matrix<'a> {
    class: u8,
    name: &'a [u8],
    /// Number of elements, the product of the dimensions.
    len: usize,
    body: Cursor<'a>,
}
impl<'a> Matrix<'a> {
    /// `None` for the zero-length placeholder written for empty values.
    fn parse(mut body: Cursor<'a>) -> Result<Option<Self>> {
        if body.bytes.is_empty() {
            return Ok(None);
        }
        let flags = body.expect()?;
        if flags.data.len() < 4 {
            exn::bail!(body.malformed("short array flags"));
        }
        let class = (body.endian.u32(word(flags.data, 0)) & 0xFF) as u8;
        let endian = body.endian;
        let len: usize = body.expect()?.data.chunks_exact(4).map(|dim| endian.u32(word(dim, 0)) as usize).product();
        let name = body.expect()?.data;
        Ok(Some(Self { class, name, len, body }))
    }

    fn text(mut self) -> Result<Option<String>> {
        if self.class != MX_CHAR {
            return Ok(None);
        }
        let Some(real) = self.body.next()? else {
            return Ok(Some(String::new()));
        };
        let endian = self.body.endian;
        Ok(match real.kind {
            MI_UINT16 | MI_UTF16 => {
                let units: Vec<u16> = real.data.chunks_exact(2).map(|unit| endian.u16([unit[0], unit[1]])).collect();
                Some(String::from_utf16_lossy(&units))
            },
            MI_INT8 | MI_UINT8 | MI_UTF8 => Some(String::from_utf8_lossy(real.data).into_owned()),
            _ => None,
        })
    }

    fn start_time(mut self) -> Result<Option<PrimitiveDateTime>> {
        match self.class {
            MX_CHAR if self.name == START_TIME_FIELD => return Ok(self.text()?.as_deref().and_then(parse)),
            MX_STRUCT => {},
            _ => return Ok(None),
        }
        let width = self.body.expect()?;
        if width.data.len() < 4 {
            exn::bail!(self.body.malformed("short field name length"));
        }
        let width = self.body.endian.u32(word(width.data, 0)) as usize;
        let names = self.body.expect()?.data;
        if width == 0 || self.len == 0 {
            return Ok(None);
        }
        let names: Vec<&[u8]> =
            names.chunks(width).map(|name| &name[..memchr::memchr(0, name).unwrap_or(name.len())]).collect();

        // Values follow the names table, one array per field in name order
        // for each element in turn.
        let mut fields = Vec::with_capacity(names.len());
        for _ in &names {
            let field = self.body.expect()?;
            if field.kind != MI_MATRIX {
                exn::bail!(self.body.malformed("struct field is not an array"));
            }
            fields.push(Matrix::parse(self.body.child(field.data))?);
        }
        if let Some(index) = names.iter().position(|name| *name == START_TIME_FIELD) {
            let text = match fields.into_iter().nth(index).flatten() {
                Some(field) => field.text()?,
                None => None,
            };
            return Ok(text.as_deref().and_then(parse));
        }
        for field in fields.into_iter().flatten() {
            if let Some(found) = field.start_time()? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}
