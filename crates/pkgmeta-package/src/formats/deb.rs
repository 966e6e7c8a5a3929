//! Debian binary packages.
//!
//! A `.deb` is an `ar` archive whose `control.tar[.gz|.xz|.zst]` member holds
//! the `control` file with the package's RFC 822 style fields.

use std::io::{Read, Seek};

use flate2::read::GzDecoder;
use tracing::{debug, trace};
use xz2::read::XzDecoder;

use super::{source::Source, AR_MAGIC_BYTES};
use crate::{
    error::{decode_error, malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const AR_HEADER_LEN: u64 = 60;
const AR_FMAG: &[u8; 2] = b"`\n";

#[derive(Debug, PartialEq, Eq)]
struct ArMember {
    name: String,
    offset: u64,
    size: u64,
}

/// Finds the first member whose name satisfies `wanted`.
fn find_member<R: Read + Seek>(
    src: &mut Source<'_, R>,
    wanted: impl Fn(&str) -> bool,
) -> ParseResult<Option<ArMember>> {
    if !src.starts_with(&AR_MAGIC_BYTES)? {
        return Err(malformed("missing ar signature"));
    }

    let mut pos = AR_MAGIC_BYTES.len() as u64;
    while pos + AR_HEADER_LEN <= src.len() {
        let header = src.read_at(pos, AR_HEADER_LEN)?;
        if &header[58..60] != AR_FMAG {
            return Err(malformed(format!("bad ar member header at offset {pos}")));
        }
        let name = String::from_utf8_lossy(&header[..16])
            .trim_end()
            .trim_end_matches('/')
            .to_string();
        let size = std::str::from_utf8(&header[48..58])
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| malformed(format!("bad size for ar member `{name}`")))?;

        let offset = pos + AR_HEADER_LEN;
        src.check_range(offset, size)?;
        trace!(member = %name, size, "ar member");
        if wanted(&name) {
            return Ok(Some(ArMember { name, offset, size }));
        }
        pos = offset + size + (size & 1);
    }
    Ok(None)
}

fn decoder<'a, R: Read + 'a>(name: &str, raw: R) -> ParseResult<Box<dyn Read + 'a>> {
    let ext = name.strip_prefix("control.tar").unwrap_or_default();
    let reader: Box<dyn Read + 'a> = match ext {
        "" => Box::new(raw),
        ".gz" => Box::new(GzDecoder::new(raw)),
        ".xz" => Box::new(XzDecoder::new(raw)),
        ".zst" => {
            Box::new(
                zstd::stream::read::Decoder::new(raw)
                    .map_err(|err| decode_error("opening zstd control archive", err))?,
            )
        }
        other => return Err(missing(format!("unsupported control archive compression `{other}`"))),
    };
    Ok(reader)
}

/// Returns the `Package` and `Version` fields of the first paragraph.
fn parse_control(text: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let key = key.trim();
        if key.eq_ignore_ascii_case("Package") && name.is_none() {
            name = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("Version") && version.is_none() {
            version = Some(value.to_string());
        }
    }
    (name, version)
}

fn read_control<R: Read + Seek>(src: &mut Source<'_, R>, member: &ArMember) -> ParseResult<Option<String>> {
    let limit = src.max_member();
    let raw = src.take_at(member.offset, member.size)?;
    let mut archive = tar::Archive::new(decoder(&member.name, raw)?.take(limit));

    let entries = archive
        .entries()
        .map_err(|err| decode_error("reading control archive", err))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| decode_error("reading control archive", err))?;
        let path = entry
            .path()
            .map_err(|err| decode_error("reading control archive entry path", err))?
            .to_string_lossy()
            .into_owned();
        if path != "./control" && path != "control" {
            continue;
        }
        if entry.size() > limit {
            return Err(malformed(format!(
                "control file of {} bytes exceeds the {limit} byte limit",
                entry.size()
            )));
        }
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|err| decode_error("reading control file", err))?;
        return Ok(Some(String::from_utf8_lossy(&contents).into_owned()));
    }
    Ok(None)
}

pub fn extract<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<PackageIdentity> {
    let member = find_member(src, |name| name.starts_with("control.tar"))?
        .ok_or_else(|| missing("no control archive member"))?;
    debug!(member = %member.name, size = member.size, "found control archive");

    let control = read_control(src, &member)?.ok_or_else(|| missing("control archive has no control file"))?;
    let (name, version) = parse_control(&control);
    let name = name.ok_or_else(|| missing("control file has no Package field"))?;
    Ok(PackageIdentity::new(name, version.unwrap_or_default()))
}
