//! Windows Installer databases.
//!
//! An MSI file is a compound file whose table streams have compressed
//! names. Strings live in a shared pool (`_StringPool` + `_StringData`) and
//! tables store column-major rows of pool references.

use std::io::{Read, Seek};

use encoding_rs::Encoding;
use tracing::trace;

use super::{
    binary::{u16_le, u32_le},
    cfb::{CompoundFile, DirEntry},
    source::Source,
};
use crate::{
    error::{malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const STRING_POOL: &str = "!_StringPool";
const STRING_DATA: &str = "!_StringData";
const PROPERTY_TABLE: &str = "!Property";

const LONG_REFS_FLAG: u32 = 0x8000_0000;

const NAME_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz._";

/// Expands a compressed stream name as stored in the compound file
/// directory. Table streams come out prefixed with `!`.
pub fn decode_stream_name(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() * 2);
    for ch in encoded.chars() {
        let code = ch as u32;
        match code {
            0x3800..=0x47ff => {
                let value = code - 0x3800;
                out.push(NAME_ALPHABET[(value & 0x3f) as usize] as char);
                out.push(NAME_ALPHABET[((value >> 6) & 0x3f) as usize] as char);
            }
            0x4800..=0x483f => out.push(NAME_ALPHABET[(code - 0x4800) as usize] as char),
            0x4840 => out.push('!'),
            _ => out.push(ch),
        }
    }
    out
}

/// Maps a Windows codepage to its text encoding. Codepage 0 (neutral) and
/// unknown codepages decode as Windows-1252.
pub(crate) fn codepage_encoding(codepage: u32) -> &'static Encoding {
    match codepage {
        65001 => encoding_rs::UTF_8,
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        _ => encoding_rs::WINDOWS_1252,
    }
}

/// Interned strings shared by every table of the database.
#[derive(Debug)]
struct StringPool {
    strings: Vec<String>,
    long_refs: bool,
}

impl StringPool {
    fn parse(pool: &[u8], data: &[u8]) -> ParseResult<Self> {
        if pool.len() < 4 {
            return Err(malformed("string pool header is truncated"));
        }
        let header = u32_le(pool, 0)?;
        let long_refs = header & LONG_REFS_FLAG != 0;
        let encoding = codepage_encoding(header & !LONG_REFS_FLAG);

        // Index 0 is the null string.
        let mut strings = vec![String::new()];
        let mut offset = 0usize;
        let mut pos = 4;
        while pos + 4 <= pool.len() {
            let mut len = u32::from(u16_le(pool, pos)?);
            let refcount = u16_le(pool, pos + 2)?;
            pos += 4;
            if len == 0 && refcount > 0 {
                // Strings longer than 64 KiB: the refcount word holds the high
                // half and the next entry the low half and the real refcount.
                if pos + 4 > pool.len() {
                    return Err(malformed("string pool ends inside a long string entry"));
                }
                len = (u32::from(refcount) << 16) | u32::from(u16_le(pool, pos)?);
                pos += 4;
            }

            let len = len as usize;
            let end = offset
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    malformed(format!(
                        "string pool entry {} overruns the {} byte string data",
                        strings.len(),
                        data.len()
                    ))
                })?;
            let (text, _) = encoding.decode_without_bom_handling(&data[offset..end]);
            strings.push(text.into_owned());
            offset = end;
        }

        trace!(
            count = strings.len() - 1,
            long_refs,
            encoding = encoding.name(),
            "parsed MSI string pool"
        );
        Ok(Self { strings, long_refs })
    }

    fn ref_size(&self) -> usize {
        if self.long_refs {
            3
        } else {
            2
        }
    }

    fn read_ref(&self, buf: &[u8], pos: usize) -> ParseResult<&str> {
        let low = usize::from(u16_le(buf, pos)?);
        let index = if self.long_refs {
            let high = *buf
                .get(pos + 2)
                .ok_or_else(|| malformed("string reference is truncated"))?;
            low | (usize::from(high) << 16)
        } else {
            low
        };
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| malformed(format!("string reference {index} is outside the pool")))
    }
}

/// Decodes the two string columns of the `Property` table into pairs.
fn property_rows<'p>(table: &[u8], pool: &'p StringPool) -> ParseResult<Vec<(&'p str, &'p str)>> {
    let width = pool.ref_size();
    let row_len = width * 2;
    if table.len() % row_len != 0 {
        return Err(malformed(format!(
            "property table length {} is not a multiple of its {row_len} byte rows",
            table.len()
        )));
    }
    let rows = table.len() / row_len;
    let values_at = rows * width;
    (0..rows)
        .map(|row| -> ParseResult<(&'p str, &'p str)> {
            let key = pool.read_ref(table, row * width)?;
            let value = pool.read_ref(table, values_at + row * width)?;
            Ok((key, value))
        })
        .collect()
}

fn find_stream<'c>(cfb: &'c CompoundFile, name: &str) -> Option<&'c DirEntry> {
    cfb.entries()
        .iter()
        .find(|entry| entry.is_stream() && decode_stream_name(&entry.name) == name)
}

pub fn extract<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<PackageIdentity> {
    let cfb = CompoundFile::open(src)?;

    let (Some(pool), Some(data)) = (find_stream(&cfb, STRING_POOL), find_stream(&cfb, STRING_DATA))
    else {
        return Err(missing("database has no string pool"));
    };
    let pool = cfb.read_stream(src, pool)?;
    let data = cfb.read_stream(src, data)?;
    let pool = StringPool::parse(&pool, &data)?;

    let table = find_stream(&cfb, PROPERTY_TABLE).ok_or_else(|| missing("database has no Property table"))?;
    let table = cfb.read_stream(src, table)?;
    let rows = property_rows(&table, &pool)?;

    let lookup = |key: &str| rows.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
    let name = lookup("ProductName").ok_or_else(|| missing("Property table has no ProductName"))?;
    let version = lookup("ProductVersion").unwrap_or_default();

    Ok(PackageIdentity::new(name, version))
}
