//! Flat macOS installer packages (XAR archives).
//!
//! The table of contents is zlib-compressed XML describing the heap. Product
//! packages carry a `Distribution` script at the top level; component
//! packages carry a `PackageInfo` file, possibly inside a `*.pkg` directory.
//! Both are scanned with regular expressions rather than a DOM.

use std::{
    io::{Read, Seek},
    sync::LazyLock,
};

use flate2::read::ZlibDecoder;
use regex::Regex;
use tracing::{debug, trace};
use xz2::read::XzDecoder;

use super::{
    binary::{u16_be, u64_be},
    generic,
    source::Source,
    XAR_MAGIC_BYTES,
};
use crate::{
    error::{decode_error, malformed, missing, ParseResult},
    metadata::PackageIdentity,
};

const HEADER_LEN: u64 = 28;

static FILE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)file\b[^>]*>").expect("unable to compile xar file tag regex")
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<name>([^<]*)</name>").expect("unable to compile xar name regex"));
static DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<data>(.*?)</data>").expect("unable to compile xar data regex"));
static DATA_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(offset|length|size)>\s*(\d+)\s*</")
        .expect("unable to compile xar data field regex")
});
static ENCODING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<encoding\b[^>]*\bstyle\s*=\s*"([^"]*)""#)
        .expect("unable to compile xar encoding regex")
});
static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(bundle|product|pkg-ref|pkg-info)\b([^>]*)>")
        .expect("unable to compile installer element regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("unable to compile attribute regex")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>([^<]*)</title>").expect("unable to compile title regex"));

#[derive(Debug, Default, PartialEq, Eq)]
struct DataRef {
    offset: u64,
    length: u64,
    size: u64,
    encoding: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct TocFile {
    name: String,
    depth: usize,
    data: Option<DataRef>,
}

impl TocFile {
    /// Builds an entry from the element's own text, nested files excluded.
    fn parse(own: &str, depth: usize) -> Self {
        let name = NAME_RE
            .captures(own)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
            .unwrap_or_default();

        let data = DATA_RE.captures(own).and_then(|c| c.get(1)).map(|body| {
            let body = body.as_str();
            let mut data = DataRef::default();
            for field in DATA_FIELD_RE.captures_iter(body) {
                let value = field[2].parse().unwrap_or(u64::MAX);
                match &field[1] {
                    "offset" => data.offset = value,
                    "length" => data.length = value,
                    _ => data.size = value,
                }
            }
            data.encoding = ENCODING_RE
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            data
        });

        Self { name, depth, data }
    }
}

/// Lists every `<file>` element of the TOC with its nesting depth.
fn toc_files(toc: &str) -> Vec<TocFile> {
    struct Frame {
        own: String,
        last: usize,
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut files = Vec::new();
    for tag in FILE_TAG_RE.find_iter(toc) {
        if tag.as_str().ends_with("/>") {
            continue;
        }
        if let Some(top) = stack.last_mut() {
            top.own.push_str(&toc[top.last..tag.start()]);
        }
        if tag.as_str().starts_with("</") {
            if let Some(frame) = stack.pop() {
                files.push(TocFile::parse(&frame.own, stack.len()));
                if let Some(parent) = stack.last_mut() {
                    parent.last = tag.end();
                }
            }
        } else {
            stack.push(Frame {
                own: String::new(),
                last: tag.end(),
            });
        }
    }
    files
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32)
            }
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn attr(attrs: &str, key: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|c| &c[1] == key)
        .and_then(|c| c.get(2).or_else(|| c.get(3)))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|v| !v.is_empty())
}

fn bundle_name(attrs: &str) -> Option<String> {
    attr(attrs, "path")
        .and_then(|path| {
            let base = generic::base_name(path.trim_end_matches('/')).to_string();
            let ext = generic::extension(&base)?;
            ext.eq_ignore_ascii_case("app")
                .then(|| generic::file_stem(&base).to_string())
        })
        .filter(|name| !name.is_empty())
        .or_else(|| attr(attrs, "CFBundleName"))
}

/// Reads a name and version out of a `Distribution` or `PackageInfo`
/// document.
fn identity_from_xml(xml: &str) -> (Option<String>, Option<String>) {
    let mut bundle = (None, None);
    let mut product = (None, None);
    let mut pkg_ref = (None, None);
    let mut pkg_info = (None, None);

    for element in ELEMENT_RE.captures_iter(xml) {
        let attrs = &element[2];
        let slot = match &element[1] {
            "bundle" => {
                if bundle.0.is_none() {
                    bundle.0 = bundle_name(attrs);
                }
                if bundle.1.is_none() {
                    bundle.1 = attr(attrs, "CFBundleShortVersionString");
                }
                continue;
            }
            "product" => &mut product,
            "pkg-ref" => &mut pkg_ref,
            _ => &mut pkg_info,
        };
        let id_key = if &element[1] == "pkg-info" {
            "identifier"
        } else {
            "id"
        };
        if slot.0.is_none() {
            slot.0 = attr(attrs, id_key);
        }
        if slot.1.is_none() {
            slot.1 = attr(attrs, "version");
        }
    }

    let title = TITLE_RE
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty());

    let name = bundle.0.or(title).or(product.0).or(pkg_ref.0).or(pkg_info.0);
    let version = bundle.1.or(product.1).or(pkg_ref.1).or(pkg_info.1);
    (name, version)
}

fn read_member<R: Read + Seek>(
    src: &mut Source<'_, R>,
    heap_start: u64,
    file: &TocFile,
) -> ParseResult<String> {
    let Some(data) = &file.data else {
        return Err(missing(format!("`{}` has no data", file.name)));
    };
    src.check_member(data.size, "xar member")?;
    let start = heap_start
        .checked_add(data.offset)
        .ok_or_else(|| malformed("xar member offset overflows"))?;
    let limit = src.max_member();
    let raw = src.take_at(start, data.length)?;

    let mut out = Vec::new();
    let read = match data.encoding.as_deref().unwrap_or("application/octet-stream") {
        "application/x-gzip" => ZlibDecoder::new(raw).take(limit.saturating_add(1)).read_to_end(&mut out),
        "application/x-xz" => XzDecoder::new(raw).take(limit.saturating_add(1)).read_to_end(&mut out),
        "application/octet-stream" => raw.take(limit.saturating_add(1)).read_to_end(&mut out),
        other => return Err(missing(format!("unsupported member encoding `{other}`"))),
    };
    read.map_err(|err| decode_error(&format!("decoding `{}`", file.name), err))?;
    if out.len() as u64 > limit {
        return Err(malformed(format!("`{}` exceeds the {limit} byte limit", file.name)));
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn read_toc<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<(String, u64)> {
    let header = src.read_at(0, HEADER_LEN)?;
    if header[..4] != XAR_MAGIC_BYTES {
        return Err(malformed("missing xar signature"));
    }
    let header_len = u64::from(u16_be(&header, 4)?);
    if header_len < HEADER_LEN {
        return Err(malformed(format!("xar header length {header_len} is too small")));
    }
    let compressed_len = u64_be(&header, 8)?;
    let toc_len = u64_be(&header, 16)?;
    src.check_member(toc_len, "xar table of contents")?;

    let compressed = src.read_at(header_len, compressed_len)?;
    let mut toc = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(toc_len)
        .read_to_end(&mut toc)
        .map_err(|err| decode_error("decompressing xar table of contents", err))?;
    if toc.len() as u64 != toc_len {
        return Err(malformed(format!(
            "xar table of contents is {} bytes, header says {toc_len}",
            toc.len()
        )));
    }

    let toc = String::from_utf8(toc).map_err(|_| malformed("xar table of contents is not UTF-8"))?;
    Ok((toc, header_len + compressed_len))
}

pub fn extract<R: Read + Seek>(src: &mut Source<'_, R>) -> ParseResult<PackageIdentity> {
    let (toc, heap_start) = read_toc(src)?;
    let files = toc_files(&toc);
    trace!(entries = files.len(), heap_start, "read xar table of contents");

    let candidates = files
        .iter()
        .filter(|f| f.name == "Distribution" && f.depth == 0)
        .chain(files.iter().filter(|f| f.name == "PackageInfo"));

    for file in candidates {
        let xml = read_member(src, heap_start, file)?;
        let (name, version) = identity_from_xml(&xml);
        if let Some(name) = name {
            debug!(member = %file.name, "found installer identity");
            return Ok(PackageIdentity::new(name, version.unwrap_or_default()));
        }
    }

    Err(missing("no Distribution or PackageInfo with a product name"))
}
