//! RPM packages.
//!
//! Layout: a 96 byte lead, the signature header padded to 8 bytes, then the
//! main header. Both headers are an index of big-endian
//! `(tag, type, offset, count)` entries followed by a data store.

use std::io::{Read, Seek};

use tracing::trace;

use super::{binary::u32_be, source::Source, RPM_MAGIC_BYTES};
use crate::{
    error::{malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const LEAD_LEN: u64 = 96;
const HEADER_MAGIC: [u8; 4] = [0x8e, 0xad, 0xe8, 0x01];
const HEADER_PREAMBLE_LEN: u64 = 16;
const INDEX_ENTRY_LEN: u64 = 16;

const TAG_NAME: u32 = 1000;
const TAG_VERSION: u32 = 1001;
const TAG_RELEASE: u32 = 1002;

const TYPE_STRING: u32 = 6;
const TYPE_STRING_ARRAY: u32 = 8;
const TYPE_I18NSTRING: u32 = 9;

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    tag: u32,
    kind: u32,
    offset: u32,
}

struct Header {
    index: Vec<IndexEntry>,
    store: Vec<u8>,
}

impl Header {
    /// Reads the header structure at `offset`, returning it with the offset
    /// just past its data store.
    fn read<R: Read + Seek>(src: &mut Source<'_, R>, offset: u64) -> ParseResult<(Self, u64)> {
        let preamble = src.read_at(offset, HEADER_PREAMBLE_LEN)?;
        if preamble[..4] != HEADER_MAGIC {
            return Err(malformed(format!("bad rpm header magic at offset {offset}")));
        }
        let count = u64::from(u32_be(&preamble, 8)?);
        let store_len = u64::from(u32_be(&preamble, 12)?);

        let index_len = count * INDEX_ENTRY_LEN;
        src.check_member(index_len + store_len, "rpm header")?;
        let index_at = offset + HEADER_PREAMBLE_LEN;
        let raw_index = src.read_at(index_at, index_len)?;
        let store = src.read_at(index_at + index_len, store_len)?;

        let index = raw_index
            .chunks_exact(INDEX_ENTRY_LEN as usize)
            .map(|raw| -> ParseResult<IndexEntry> {
                Ok(IndexEntry {
                    tag: u32_be(raw, 0)?,
                    kind: u32_be(raw, 4)?,
                    offset: u32_be(raw, 8)?,
                })
            })
            .collect::<ParseResult<Vec<_>>>()?;

        trace!(offset, entries = count, store_len, "read rpm header");
        Ok((Self { index, store }, index_at + index_len + store_len))
    }

    fn string(&self, tag: u32) -> ParseResult<Option<String>> {
        let Some(entry) = self.index.iter().find(|e| e.tag == tag) else {
            return Ok(None);
        };
        if !matches!(entry.kind, TYPE_STRING | TYPE_STRING_ARRAY | TYPE_I18NSTRING) {
            return Err(malformed(format!(
                "rpm tag {tag} has type {}, expected a string",
                entry.kind
            )));
        }
        let start = entry.offset as usize;
        let tail = self
            .store
            .get(start..)
            .ok_or_else(|| malformed(format!("rpm tag {tag} points outside the data store")))?;
        let len = tail
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| malformed(format!("rpm tag {tag} string is not terminated")))?;
        Ok(Some(String::from_utf8_lossy(&tail[..len]).into_owned()))
    }
}

pub fn extract<R: Read + Seek>(
    src: &mut Source<'_, R>,
    include_release: bool,
) -> ParseResult<PackageIdentity> {
    if src.len() < LEAD_LEN || !src.starts_with(&RPM_MAGIC_BYTES)? {
        return Err(malformed("missing rpm lead"));
    }

    let (_, signature_end) = Header::read(src, LEAD_LEN)?;
    let main_at = signature_end.next_multiple_of(8);
    let (header, _) = Header::read(src, main_at)?;

    let name = header
        .string(TAG_NAME)?
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| missing("rpm header has no NAME"))?;
    let mut version = header.string(TAG_VERSION)?.unwrap_or_default();
    if include_release && !version.is_empty() {
        if let Some(release) = header.string(TAG_RELEASE)?.filter(|r| !r.is_empty()) {
            version = format!("{version}-{release}");
        }
    }

    Ok(PackageIdentity::new(name, version))
}
