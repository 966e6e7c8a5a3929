//! Bounds-checked integer reads over byte slices.

use crate::error::{malformed, ParseResult};

pub(crate) fn bytes_at(buf: &[u8], off: usize, len: usize) -> ParseResult<&[u8]> {
    off.checked_add(len)
        .and_then(|end| buf.get(off..end))
        .ok_or_else(|| malformed(format!("{len} bytes at offset {off} exceed a {} byte structure", buf.len())))
}

fn array<const N: usize>(buf: &[u8], off: usize) -> ParseResult<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes_at(buf, off, N)?);
    Ok(out)
}

pub(crate) fn u16_le(buf: &[u8], off: usize) -> ParseResult<u16> {
    array(buf, off).map(u16::from_le_bytes)
}

pub(crate) fn u32_le(buf: &[u8], off: usize) -> ParseResult<u32> {
    array(buf, off).map(u32::from_le_bytes)
}

pub(crate) fn u64_le(buf: &[u8], off: usize) -> ParseResult<u64> {
    array(buf, off).map(u64::from_le_bytes)
}

pub(crate) fn u16_be(buf: &[u8], off: usize) -> ParseResult<u16> {
    array(buf, off).map(u16::from_be_bytes)
}

pub(crate) fn u32_be(buf: &[u8], off: usize) -> ParseResult<u32> {
    array(buf, off).map(u32::from_be_bytes)
}

pub(crate) fn u64_be(buf: &[u8], off: usize) -> ParseResult<u64> {
    array(buf, off).map(u64::from_be_bytes)
}

/// Decodes UTF-16LE code units, stopping at the first NUL.
pub(crate) fn utf16_le_until_nul(buf: &[u8]) -> String {
    let units: Vec<u16> = buf
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

pub(crate) fn align4(n: usize) -> usize {
    (n + 3) & !3
}
