//! Apple disk images (UDIF).
//!
//! A disk image is recognised by the `koly` trailer in its last 512 bytes.
//! The filesystem inside is not decoded, so a valid image never yields a
//! name of its own and the caller falls back to the file name.

use std::io::{Read, Seek};

use tracing::trace;

use super::{binary::u32_be, source::Source};
use crate::{
    error::{malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const TRAILER_LEN: u64 = 512;
const TRAILER_MAGIC: &[u8; 4] = b"koly";

pub fn extract<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<PackageIdentity> {
    if src.len() < TRAILER_LEN {
        return Err(malformed("disk image is shorter than its trailer"));
    }
    let trailer = src.read_at(src.len() - TRAILER_LEN, TRAILER_LEN)?;
    if &trailer[..4] != TRAILER_MAGIC {
        return Err(malformed("disk image has no koly trailer"));
    }

    let version = u32_be(&trailer, 4)?;
    let header_size = u32_be(&trailer, 8)?;
    if header_size as u64 != TRAILER_LEN {
        return Err(malformed(format!("koly trailer declares size {header_size}")));
    }
    trace!(version, "found disk image trailer");

    Err(missing("disk image contents are not inspected"))
}
