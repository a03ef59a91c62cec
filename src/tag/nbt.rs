//! Binary named-tag reader.
//!
//! Layout: a type byte, a u16-length-prefixed name, then the payload. All
//! integers are big-endian. Files may be gzip, zlib or uncompressed; the
//! first two bytes decide which.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use super::{Scalar, Tag, TagReader};
use crate::error::{HoardError, Result};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Same nesting limit the game itself enforces.
const MAX_NESTING: usize = 512;

pub struct NbtReader;

impl TagReader for NbtReader {
    fn name(&self) -> &'static str {
        "nbt"
    }

    fn read(&self, bytes: &[u8]) -> Result<Tag> {
        let raw = decompress(bytes)?;
        let mut cursor = Cursor::new(&raw);

        let kind = cursor.u8()?;
        if kind != TAG_COMPOUND {
            return Err(HoardError::Tag(format!("root tag type {kind}, expected compound")));
        }
        cursor.string()?;
        cursor.payload(kind, 0)
    }
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let outcome = match bytes {
        [0x1f, 0x8b, ..] => GzDecoder::new(bytes).read_to_end(&mut out),
        [0x78, _, ..] => ZlibDecoder::new(bytes).read_to_end(&mut out),
        _ => return Ok(bytes.to_vec()),
    };
    outcome.map_err(|e| HoardError::Tag(format!("decompression failed: {e}")))?;
    Ok(out)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                HoardError::Tag(format!("unexpected end of data at byte {}", self.pos))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn length(&mut self, elem_size: usize) -> Result<usize> {
        let len = self.i32()?;
        let len = usize::try_from(len)
            .map_err(|_| HoardError::Tag(format!("negative length {len} at byte {}", self.pos)))?;
        // reject lengths the remaining bytes can't possibly hold before allocating
        if len.saturating_mul(elem_size) > self.data.len() - self.pos {
            return Err(HoardError::Tag(format!("length {len} exceeds remaining data")));
        }
        Ok(len)
    }

    fn string(&mut self) -> Result<String> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        // modified utf-8 differs from utf-8 only for nul and supplementary chars
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    fn payload(&mut self, kind: u8, depth: usize) -> Result<Tag> {
        if depth > MAX_NESTING {
            return Err(HoardError::Tag(format!("nesting deeper than {MAX_NESTING}")));
        }

        let tag = match kind {
            TAG_BYTE => Tag::Scalar(Scalar::Int(self.u8()? as i8 as i64)),
            TAG_SHORT => Tag::Scalar(Scalar::Int(self.i16()? as i64)),
            TAG_INT => Tag::Scalar(Scalar::Int(self.i32()? as i64)),
            TAG_LONG => Tag::Scalar(Scalar::Int(self.i64()?)),
            TAG_FLOAT => Tag::Scalar(Scalar::Float(f32::from_be_bytes(self.array()?) as f64)),
            TAG_DOUBLE => Tag::Scalar(Scalar::Float(f64::from_be_bytes(self.array()?))),
            TAG_STRING => Tag::Scalar(Scalar::Str(self.string()?)),
            TAG_BYTE_ARRAY => {
                let len = self.length(1)?;
                let bytes = self.take(len)?;
                Tag::List(
                    bytes
                        .iter()
                        .map(|b| Tag::Scalar(Scalar::Int(*b as i8 as i64)))
                        .collect(),
                )
            }
            TAG_INT_ARRAY => {
                let len = self.length(4)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Tag::Scalar(Scalar::Int(self.i32()? as i64)));
                }
                Tag::List(items)
            }
            TAG_LONG_ARRAY => {
                let len = self.length(8)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Tag::Scalar(Scalar::Int(self.i64()?)));
                }
                Tag::List(items)
            }
            TAG_LIST => {
                let elem_kind = self.u8()?;
                let len = self.length(0)?;
                if elem_kind == TAG_END && len > 0 {
                    return Err(HoardError::Tag("non-empty list of end tags".to_string()));
                }
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.payload(elem_kind, depth + 1)?);
                }
                Tag::List(items)
            }
            TAG_COMPOUND => {
                let mut map = HashMap::new();
                loop {
                    let child_kind = self.u8()?;
                    if child_kind == TAG_END {
                        break;
                    }
                    let name = self.string()?;
                    let value = self.payload(child_kind, depth + 1)?;
                    map.insert(name, value);
                }
                Tag::Compound(map)
            }
            other => {
                return Err(HoardError::Tag(format!(
                    "unknown tag type {other} at byte {}",
                    self.pos
                )))
            }
        };

        Ok(tag)
    }
}
