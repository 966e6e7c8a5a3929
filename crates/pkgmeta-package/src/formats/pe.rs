//! Windows PE executables.
//!
//! The version resource (`RT_VERSION`) is located through the resource data
//! directory and decoded as a `VS_VERSIONINFO` block tree. String values come
//! from `StringFileInfo` tables; `VS_FIXEDFILEINFO` supplies a numeric
//! version when no string version is present.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use super::{
    binary::{align4, bytes_at, u16_le, u32_le, utf16_le_until_nul},
    source::Source,
    PE_MAGIC_BYTES,
};
use crate::{
    error::{malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const DOS_HEADER_LEN: u64 = 0x40;
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const COFF_HEADER_LEN: u64 = 20;
const SECTION_HEADER_LEN: u64 = 40;

const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;
const RESOURCE_DIRECTORY: u32 = 2;

const RT_VERSION: u32 = 16;
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;
const MAX_BLOCK_DEPTH: usize = 8;
const FIXED_FILE_INFO_SIGNATURE: u32 = 0xfeef_04bd;

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_offset: u32,
}

impl Section {
    fn contains(&self, rva: u32) -> bool {
        let span = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && u64::from(rva) < u64::from(self.virtual_address) + u64::from(span)
    }

    /// File offset of `rva` and the raw bytes left in the section from there.
    fn locate(&self, rva: u32) -> Option<(u64, u64)> {
        let delta = rva.checked_sub(self.virtual_address)?;
        let remaining = self.raw_size.checked_sub(delta)?;
        Some((u64::from(self.raw_offset) + u64::from(delta), u64::from(remaining)))
    }
}

struct Image {
    sections: Vec<Section>,
    resource_rva: u32,
}

impl Image {
    fn parse<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<Option<Self>> {
        if src.len() < DOS_HEADER_LEN || !src.starts_with(&PE_MAGIC_BYTES)? {
            return Err(malformed("missing DOS header"));
        }
        let dos = src.read_at(0, DOS_HEADER_LEN)?;
        let pe_at = u64::from(u32_le(&dos, 0x3c)?);

        let signature = src.read_at(pe_at, 4)?;
        if signature != PE_SIGNATURE {
            return Err(malformed(format!("no PE signature at offset {pe_at}")));
        }
        let coff = src.read_at(pe_at + 4, COFF_HEADER_LEN)?;
        let section_count = u64::from(u16_le(&coff, 2)?);
        let optional_len = u64::from(u16_le(&coff, 16)?);

        let optional_at = pe_at + 4 + COFF_HEADER_LEN;
        let optional = src.read_at(optional_at, optional_len)?;
        let (count_at, dirs_at) = match u16_le(&optional, 0)? {
            PE32_MAGIC => (92, 96),
            PE32_PLUS_MAGIC => (108, 112),
            other => return Err(malformed(format!("unknown optional header magic {other:#x}"))),
        };
        let dir_count = u32_le(&optional, count_at)?;
        if dir_count <= RESOURCE_DIRECTORY {
            return Ok(None);
        }
        let dir = bytes_at(&optional, dirs_at + RESOURCE_DIRECTORY as usize * 8, 8)?;
        let resource_rva = u32_le(dir, 0)?;
        if resource_rva == 0 {
            return Ok(None);
        }

        let table = src.read_at(optional_at + optional_len, section_count * SECTION_HEADER_LEN)?;
        let sections = table
            .chunks_exact(SECTION_HEADER_LEN as usize)
            .map(|raw| -> ParseResult<Section> {
                Ok(Section {
                    virtual_size: u32_le(raw, 8)?,
                    virtual_address: u32_le(raw, 12)?,
                    raw_size: u32_le(raw, 16)?,
                    raw_offset: u32_le(raw, 20)?,
                })
            })
            .collect::<ParseResult<Vec<_>>>()?;

        trace!(sections = sections.len(), resource_rva, "parsed PE headers");
        Ok(Some(Self {
            sections,
            resource_rva,
        }))
    }

    fn locate(&self, rva: u32) -> ParseResult<(u64, u64)> {
        self.sections
            .iter()
            .find(|s| s.contains(rva))
            .and_then(|s| s.locate(rva))
            .ok_or_else(|| malformed(format!("RVA {rva:#x} is not backed by any section")))
    }
}

/// The resource section, read a few bytes at a time so that a large `.rsrc`
/// is never buffered whole.
struct ResourceSection {
    at: u64,
    len: u64,
}

impl ResourceSection {
    fn read<R: Read + Seek>(&self, src: &mut Source<'_, R>, offset: u64, len: u64) -> ParseResult<Vec<u8>> {
        if offset.checked_add(len).map_or(true, |end| end > self.len) {
            return Err(malformed(format!(
                "resource data at {offset:#x} runs past the section end"
            )));
        }
        src.read_at(self.at + offset, len)
    }

    /// Follows one resource directory level, returning the entry's target
    /// offset (relative to the resource root) and whether it is a subdirectory.
    fn entry<R: Read + Seek>(
        &self,
        src: &mut Source<'_, R>,
        dir: u64,
        id: Option<u32>,
    ) -> ParseResult<Option<(u64, bool)>> {
        let header = self.read(src, dir, 16)?;
        let count = u64::from(u16_le(&header, 12)?) + u64::from(u16_le(&header, 14)?);
        let entries = self.read(src, dir + 16, count * 8)?;
        for entry in entries.chunks_exact(8) {
            let name = u32_le(entry, 0)?;
            let target = u32_le(entry, 4)?;
            let matches = match id {
                Some(id) => name & SUBDIRECTORY_FLAG == 0 && name == id,
                None => true,
            };
            if matches {
                return Ok(Some((
                    u64::from(target & !SUBDIRECTORY_FLAG),
                    target & SUBDIRECTORY_FLAG != 0,
                )));
            }
        }
        Ok(None)
    }

    /// Walks type -> name -> language to the version resource's data entry,
    /// returning its RVA and size.
    fn version_resource<R: Read + Seek>(&self, src: &mut Source<'_, R>) -> ParseResult<Option<(u32, u32)>> {
        let mut offset = 0;
        for (level, id) in [Some(RT_VERSION), None, None].into_iter().enumerate() {
            let Some((target, is_dir)) = self.entry(src, offset, id)? else {
                return Ok(None);
            };
            let expect_dir = level < 2;
            if is_dir != expect_dir {
                return Err(malformed(format!("unexpected resource entry kind at level {level}")));
            }
            offset = target;
        }
        let data = self.read(src, offset, 8)?;
        Ok(Some((u32_le(&data, 0)?, u32_le(&data, 4)?)))
    }
}

#[derive(Debug)]
struct Block<'a> {
    key: String,
    value: &'a [u8],
    children: Vec<Block<'a>>,
}

impl<'a> Block<'a> {
    fn parse(buf: &'a [u8], at: usize, depth: usize) -> ParseResult<(Self, usize)> {
        if depth > MAX_BLOCK_DEPTH {
            return Err(malformed("version resource nests too deeply"));
        }
        let len = usize::from(u16_le(buf, at)?);
        let end = at + len;
        if len < 6 || end > buf.len() {
            return Err(malformed(format!("version block at {at} has bad length {len}")));
        }
        let value_len = usize::from(u16_le(buf, at + 2)?);
        let is_text = u16_le(buf, at + 4)? == 1;

        let key_bytes = &buf[at + 6..end];
        let nul = key_bytes
            .chunks_exact(2)
            .position(|c| c[0] == 0 && c[1] == 0)
            .ok_or_else(|| malformed(format!("version block key at {at} is not terminated")))?;
        let key = utf16_le_until_nul(&key_bytes[..nul * 2]);
        let key_end = at + 6 + (nul + 1) * 2;
        let value_at = align4(key_end).min(end);
        let value_bytes = if is_text { value_len * 2 } else { value_len };
        let value_end = (value_at + value_bytes).min(end);
        let value = &buf[value_at..value_end];

        let mut children = Vec::new();
        let mut child_at = align4(value_end);
        while child_at + 6 <= end {
            // zero padding
            if u16_le(buf, child_at)? == 0 {
                break;
            }
            let (child, child_end) = Self::parse(&buf[..end], child_at, depth + 1)?;
            children.push(child);
            child_at = align4(child_end);
        }

        Ok((
            Self {
                key,
                value,
                children,
            },
            end,
        ))
    }

    fn text(&self) -> String {
        utf16_le_until_nul(self.value).trim().to_string()
    }

    /// First non-empty string named `key` in any `StringFileInfo` table.
    fn string(&self, key: &str) -> Option<String> {
        self.children
            .iter()
            .filter(|c| c.key == "StringFileInfo")
            .flat_map(|info| info.children.iter())
            .flat_map(|table| table.children.iter())
            .filter(|s| s.key == key)
            .map(Block::text)
            .find(|v| !v.is_empty())
    }

    fn fixed_product_version(&self) -> Option<String> {
        if u32_le(self.value, 0).ok()? != FIXED_FILE_INFO_SIGNATURE {
            return None;
        }
        let ms = u32_le(self.value, 16).ok()?;
        let ls = u32_le(self.value, 20).ok()?;
        if ms == 0 && ls == 0 {
            return None;
        }
        Some(format!("{}.{}.{}.{}", ms >> 16, ms & 0xffff, ls >> 16, ls & 0xffff))
    }
}

fn identity_from_version_info(data: &[u8]) -> ParseResult<PackageIdentity> {
    let (root, _) = Block::parse(data, 0, 0)?;
    if root.key != "VS_VERSION_INFO" {
        return Err(malformed(format!("unexpected version resource key `{}`", root.key)));
    }
    let name = root
        .string("ProductName")
        .ok_or_else(|| missing("version resource has no ProductName"))?;
    let version = root
        .string("ProductVersion")
        .or_else(|| root.string("FileVersion"))
        .or_else(|| root.fixed_product_version())
        .unwrap_or_default();
    Ok(PackageIdentity::new(name, version))
}

pub fn extract<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<PackageIdentity> {
    let image = Image::parse(src)?.ok_or_else(|| missing("executable has no resource directory"))?;

    let (at, len) = image.locate(image.resource_rva)?;
    let (data_rva, data_len) = ResourceSection { at, len }
        .version_resource(src)?
        .ok_or_else(|| missing("executable has no version resource"))?;

    let (data_at, available) = image.locate(data_rva)?;
    if u64::from(data_len) > available {
        return Err(malformed("version resource extends past its section"));
    }
    let data = src.read_at(data_at, u64::from(data_len))?;
    debug!(bytes = data_len, "found version resource");
    identity_from_version_info(&data)
}
