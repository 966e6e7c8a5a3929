//! Compound File Binary (structured storage) reader.
//!
//! Only what is needed to pull small streams out of an MSI database: the
//! FAT (including DIFAT extension sectors), the directory, and the mini
//! stream with its mini FAT. Streams are located by a flat scan of the
//! directory rather than by walking the red-black tree.

use std::io::{Read, Seek};

use tracing::trace;

use super::{
    binary::{u16_le, u32_le, u64_le, utf16_le_until_nul},
    source::Source,
    CFB_MAGIC_BYTES,
};
use crate::error::{malformed, ParseResult};

const HEADER_LEN: u64 = 512;
const HEADER_DIFAT_ENTRIES: usize = 109;
const DIR_ENTRY_LEN: usize = 128;

const MAX_REG_SECT: u32 = 0xffff_fffa;
const END_OF_CHAIN: u32 = 0xffff_fffe;

const OBJ_STREAM: u8 = 2;
const OBJ_ROOT: u8 = 5;

/// One stream or storage in the directory.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    kind: u8,
    start: u32,
    pub size: u64,
}

impl DirEntry {
    pub fn is_stream(&self) -> bool {
        self.kind == OBJ_STREAM
    }
}

#[derive(Debug)]
pub struct CompoundFile {
    sector_shift: u32,
    mini_shift: u32,
    mini_cutoff: u64,
    fat: Vec<u32>,
    mini_fat: Vec<u32>,
    /// Regular sectors holding the mini stream, in order.
    mini_stream_sectors: Vec<u32>,
    entries: Vec<DirEntry>,
}

impl CompoundFile {
    pub fn open<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<Self> {
        if src.len() < HEADER_LEN {
            return Err(malformed("compound file header is truncated"));
        }
        let header = src.read_at(0, HEADER_LEN)?;
        if header[..8] != CFB_MAGIC_BYTES {
            return Err(malformed("missing compound file signature"));
        }

        let major = u16_le(&header, 0x1a)?;
        let sector_shift = u32::from(u16_le(&header, 0x1e)?);
        match (major, sector_shift) {
            (3, 9) | (4, 12) => {}
            _ => {
                return Err(malformed(format!(
                    "unsupported compound file version {major} with sector shift {sector_shift}"
                )))
            }
        }
        let mini_shift = u32::from(u16_le(&header, 0x20)?);
        if mini_shift != 6 {
            return Err(malformed(format!("unsupported mini sector shift {mini_shift}")));
        }

        let sector_size = 1u64 << sector_shift;
        let max_sectors = src.len() / sector_size;

        let num_fat = u32_le(&header, 0x2c)? as u64;
        let first_dir = u32_le(&header, 0x30)?;
        let mini_cutoff = u32_le(&header, 0x38)? as u64;
        let first_mini_fat = u32_le(&header, 0x3c)?;
        let first_difat = u32_le(&header, 0x44)?;
        let num_difat = u32_le(&header, 0x48)? as u64;

        if num_fat > max_sectors || num_difat > max_sectors {
            return Err(malformed(format!(
                "header declares {num_fat} FAT and {num_difat} DIFAT sectors in a {} byte file",
                src.len()
            )));
        }

        let mut fat_sectors = Vec::with_capacity(num_fat as usize);
        for i in 0..HEADER_DIFAT_ENTRIES {
            let id = u32_le(&header, 0x4c + i * 4)?;
            if id <= MAX_REG_SECT {
                fat_sectors.push(id);
            }
        }

        let per_difat = (sector_size / 4 - 1) as usize;
        let mut next = first_difat;
        for _ in 0..num_difat {
            if next > MAX_REG_SECT {
                break;
            }
            let sector = read_sector(src, sector_shift, next)?;
            for i in 0..per_difat {
                let id = u32_le(&sector, i * 4)?;
                if id <= MAX_REG_SECT {
                    fat_sectors.push(id);
                }
            }
            next = u32_le(&sector, per_difat * 4)?;
        }

        if (fat_sectors.len() as u64) < num_fat {
            return Err(malformed(format!(
                "found {} of {num_fat} FAT sectors",
                fat_sectors.len()
            )));
        }
        fat_sectors.truncate(num_fat as usize);

        let mut fat = Vec::with_capacity(fat_sectors.len() * (sector_size / 4) as usize);
        for id in fat_sectors {
            let sector = read_sector(src, sector_shift, id)?;
            fat.extend(
                sector
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }

        let mut cfb = Self {
            sector_shift,
            mini_shift,
            mini_cutoff,
            fat,
            mini_fat: Vec::new(),
            mini_stream_sectors: Vec::new(),
            entries: Vec::new(),
        };

        let dir_sectors = chain(&cfb.fat, first_dir)?;
        let mut entries = Vec::new();
        for id in dir_sectors {
            let sector = read_sector(src, sector_shift, id)?;
            for raw in sector.chunks_exact(DIR_ENTRY_LEN) {
                entries.push(parse_dir_entry(raw, major)?);
            }
        }
        let root = entries
            .first()
            .filter(|e| e.kind == OBJ_ROOT)
            .cloned()
            .ok_or_else(|| malformed("directory does not start with a root entry"))?;
        cfb.entries = entries;

        if first_mini_fat <= MAX_REG_SECT {
            for id in chain(&cfb.fat, first_mini_fat)? {
                let sector = read_sector(src, sector_shift, id)?;
                cfb.mini_fat.extend(
                    sector
                        .chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
                );
            }
        }
        if root.size > 0 {
            cfb.mini_stream_sectors = chain(&cfb.fat, root.start)?;
            for id in &cfb.mini_stream_sectors {
                src.check_range(sector_offset(sector_shift, *id), sector_size)?;
            }
        }

        trace!(
            sector_size,
            fat_entries = cfb.fat.len(),
            directory_entries = cfb.entries.len(),
            "opened compound file"
        );
        Ok(cfb)
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Reads the full contents of a stream entry.
    pub fn read_stream<R: Read + Seek>(
        &self,
        src: &mut Source<'_, R>,
        entry: &DirEntry,
    ) -> ParseResult<Vec<u8>> {
        src.check_member(entry.size, "compound file stream")?;
        if entry.size > src.len() {
            return Err(malformed(format!(
                "stream `{}` declares {} bytes but the file holds only {}",
                entry.name,
                entry.size,
                src.len()
            )));
        }
        let size = entry.size as usize;
        let mut data = Vec::with_capacity(size);
        if entry.size == 0 {
            return Ok(data);
        }

        if entry.size < self.mini_cutoff {
            let mini_size = 1u64 << self.mini_shift;
            let per_sector = 1u64 << (self.sector_shift - self.mini_shift);
            for mini_id in chain(&self.mini_fat, entry.start)? {
                let mini_id = u64::from(mini_id);
                let host = self
                    .mini_stream_sectors
                    .get((mini_id / per_sector) as usize)
                    .ok_or_else(|| malformed(format!("mini sector {mini_id} is outside the mini stream")))?;
                let offset = sector_offset(self.sector_shift, *host) + (mini_id % per_sector) * mini_size;
                let mut buf = vec![0u8; mini_size as usize];
                src.read_exact_at(offset, &mut buf)?;
                data.extend_from_slice(&buf);
                if data.len() >= size {
                    break;
                }
            }
        } else {
            for id in chain(&self.fat, entry.start)? {
                data.extend_from_slice(&read_sector(src, self.sector_shift, id)?);
                if data.len() >= size {
                    break;
                }
            }
        }

        if data.len() < size {
            return Err(malformed(format!(
                "stream `{}` is shorter than its declared {size} bytes",
                entry.name
            )));
        }
        data.truncate(size);
        Ok(data)
    }
}

fn sector_offset(sector_shift: u32, id: u32) -> u64 {
    (u64::from(id) + 1) << sector_shift
}

fn read_sector<R: Read + Seek>(
    src: &mut Source<'_, R>,
    sector_shift: u32,
    id: u32,
) -> ParseResult<Vec<u8>> {
    if id > MAX_REG_SECT {
        return Err(malformed(format!("invalid sector id {id:#x}")));
    }
    src.read_at(sector_offset(sector_shift, id), 1u64 << sector_shift)
}

/// Follows an allocation chain, rejecting out-of-table links and cycles.
fn chain(table: &[u32], start: u32) -> ParseResult<Vec<u32>> {
    let mut ids = Vec::new();
    let mut current = start;
    while current != END_OF_CHAIN {
        if current > MAX_REG_SECT {
            return Err(malformed(format!("chain contains reserved sector id {current:#x}")));
        }
        if ids.len() >= table.len() {
            return Err(malformed("allocation chain loops"));
        }
        ids.push(current);
        current = *table
            .get(current as usize)
            .ok_or_else(|| malformed(format!("sector {current} is outside the allocation table")))?;
    }
    Ok(ids)
}

fn parse_dir_entry(raw: &[u8], major: u16) -> ParseResult<DirEntry> {
    let name_len = (u16_le(raw, 0x40)? as usize).min(64);
    let name = utf16_le_until_nul(&raw[..name_len]);
    let kind = raw[0x42];
    let start = u32_le(raw, 0x74)?;
    let mut size = u64_le(raw, 0x78)?;
    if major == 3 {
        // Version 3 writers may leave garbage in the high dword.
        size &= 0xffff_ffff;
    }
    Ok(DirEntry {
        name,
        kind,
        start,
        size,
    })
}
