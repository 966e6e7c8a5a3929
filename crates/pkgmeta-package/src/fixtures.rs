//! Builders for minimal well-formed installer packages used by tests.

use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use xz2::write::XzEncoder;

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let rem = buf.len() % align;
    if rem != 0 {
        buf.resize(buf.len() + align - rem, 0);
    }
}

fn utf16z(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

// Compound file

const SECTOR: usize = 512;
const MINI_SECTOR: usize = 64;
const MINI_CUTOFF: usize = 4096;
const FREE_SECT: u32 = 0xffff_ffff;
const END_OF_CHAIN: u32 = 0xffff_fffe;
const FAT_SECT: u32 = 0xffff_fffd;
const NO_STREAM: u32 = 0xffff_ffff;

/// Writes a version 3 compound file with a flat directory. Streams smaller
/// than the cutoff go to the mini stream.
#[derive(Default)]
pub struct CompoundFileBuilder {
    streams: Vec<(String, Vec<u8>)>,
}

fn allocate(fat: &mut [u32], next: &mut usize, count: usize) -> u32 {
    if count == 0 {
        return END_OF_CHAIN;
    }
    let first = *next;
    for id in first..first + count {
        fat[id] = if id + 1 < first + count {
            (id + 1) as u32
        } else {
            END_OF_CHAIN
        };
    }
    *next += count;
    first as u32
}

impl CompoundFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, name: &str, data: Vec<u8>) -> Self {
        self.streams.push((name.to_string(), data));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut mini_stream = Vec::new();
        let mut mini_fat = Vec::new();
        let mut mini_starts = Vec::new();
        for (_, data) in &self.streams {
            if data.is_empty() || data.len() >= MINI_CUTOFF {
                mini_starts.push(None);
                continue;
            }
            let first = mini_fat.len();
            let count = data.len().div_ceil(MINI_SECTOR);
            for i in 0..count {
                mini_fat.push(if i + 1 < count {
                    (first + i + 1) as u32
                } else {
                    END_OF_CHAIN
                });
            }
            mini_stream.extend_from_slice(data);
            pad_to(&mut mini_stream, MINI_SECTOR);
            mini_starts.push(Some(first as u32));
        }

        let dir_sectors = ((self.streams.len() + 1) * 128).div_ceil(SECTOR);
        let mini_fat_sectors = (mini_fat.len() * 4).div_ceil(SECTOR);
        let mini_stream_sectors = mini_stream.len().div_ceil(SECTOR);
        let regular_sectors: usize = self
            .streams
            .iter()
            .filter(|(_, d)| d.len() >= MINI_CUTOFF)
            .map(|(_, d)| d.len().div_ceil(SECTOR))
            .sum();
        let data_sectors = dir_sectors + mini_fat_sectors + mini_stream_sectors + regular_sectors;
        let mut fat_sectors = 1;
        while fat_sectors * (SECTOR / 4) < fat_sectors + data_sectors {
            fat_sectors += 1;
        }
        assert!(fat_sectors <= 109, "fixture too large for header DIFAT");

        let mut fat = vec![FREE_SECT; fat_sectors * (SECTOR / 4)];
        fat[..fat_sectors].fill(FAT_SECT);
        let mut next = fat_sectors;
        let dir_start = allocate(&mut fat, &mut next, dir_sectors);
        let mini_fat_start = allocate(&mut fat, &mut next, mini_fat_sectors);
        let mini_stream_start = allocate(&mut fat, &mut next, mini_stream_sectors);
        let regular_starts: Vec<Option<u32>> = self
            .streams
            .iter()
            .map(|(_, d)| {
                (d.len() >= MINI_CUTOFF).then(|| allocate(&mut fat, &mut next, d.len().div_ceil(SECTOR)))
            })
            .collect();

        let mut header = vec![0u8; SECTOR];
        header[..8].copy_from_slice(&crate::formats::CFB_MAGIC_BYTES);
        put_u16(&mut header, 0x18, 0x3e);
        put_u16(&mut header, 0x1a, 3);
        put_u16(&mut header, 0x1c, 0xfffe);
        put_u16(&mut header, 0x1e, 9);
        put_u16(&mut header, 0x20, 6);
        put_u32(&mut header, 0x2c, fat_sectors as u32);
        put_u32(&mut header, 0x30, dir_start);
        put_u32(&mut header, 0x38, MINI_CUTOFF as u32);
        put_u32(&mut header, 0x3c, mini_fat_start);
        put_u32(&mut header, 0x40, mini_fat_sectors as u32);
        put_u32(&mut header, 0x44, END_OF_CHAIN);
        for i in 0..109 {
            let id = if i < fat_sectors { i as u32 } else { FREE_SECT };
            put_u32(&mut header, 0x4c + i * 4, id);
        }

        let mut out = header;
        for id in &fat {
            out.extend_from_slice(&id.to_le_bytes());
        }

        let mut dir = Vec::new();
        let root_child = if self.streams.is_empty() { NO_STREAM } else { 1 };
        dir.extend(dir_entry("Root Entry", 5, root_child, NO_STREAM, mini_stream_start, mini_stream.len()));
        for (i, (name, data)) in self.streams.iter().enumerate() {
            let right = if i + 2 <= self.streams.len() {
                (i + 2) as u32
            } else {
                NO_STREAM
            };
            let start = mini_starts[i].or(regular_starts[i]).unwrap_or(END_OF_CHAIN);
            dir.extend(dir_entry(name, 2, NO_STREAM, right, start, data.len()));
        }
        while dir.len() % SECTOR != 0 {
            dir.extend(dir_entry("", 0, NO_STREAM, NO_STREAM, 0, 0));
        }
        out.extend(dir);

        let mut mini_fat_bytes: Vec<u8> = mini_fat.iter().flat_map(|id| id.to_le_bytes()).collect();
        if !mini_fat_bytes.is_empty() {
            mini_fat_bytes.resize(mini_fat_sectors * SECTOR, 0xff);
        }
        out.extend(mini_fat_bytes);

        pad_to(&mut mini_stream, SECTOR);
        out.extend(mini_stream);

        for (_, data) in self.streams.iter().filter(|(_, d)| d.len() >= MINI_CUTOFF) {
            let mut data = data.clone();
            pad_to(&mut data, SECTOR);
            out.extend(data);
        }
        out
    }
}

fn dir_entry(name: &str, kind: u8, child: u32, right: u32, start: u32, size: usize) -> Vec<u8> {
    let mut entry = vec![0u8; 128];
    if !name.is_empty() {
        let encoded = utf16z(name);
        entry[..encoded.len()].copy_from_slice(&encoded);
        put_u16(&mut entry, 0x40, encoded.len() as u16);
        entry[0x43] = 1;
    }
    entry[0x42] = kind;
    put_u32(&mut entry, 0x44, NO_STREAM);
    put_u32(&mut entry, 0x48, right);
    put_u32(&mut entry, 0x4c, child);
    put_u32(&mut entry, 0x74, start);
    entry[0x78..0x80].copy_from_slice(&(size as u64).to_le_bytes());
    entry
}

// MSI

const MSI_NAME_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz._";

/// Compresses a stream name the way Windows Installer stores it.
pub fn encode_msi_stream_name(name: &str) -> String {
    let (mut out, rest) = match name.strip_prefix('!') {
        Some(rest) => (String::from('\u{4840}'), rest),
        None => (String::new(), name),
    };
    let index = |c: char| MSI_NAME_ALPHABET.iter().position(|a| *a as char == c);
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match (index(chars[i]), chars.get(i + 1).and_then(|c| index(*c))) {
            (Some(low), Some(high)) => {
                out.push(char::from_u32(0x3800 + low as u32 + ((high as u32) << 6)).unwrap());
                i += 2;
            }
            (Some(low), None) => {
                out.push(char::from_u32(0x4800 + low as u32).unwrap());
                i += 1;
            }
            (None, _) => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

pub struct MsiBuilder {
    properties: Vec<(String, String)>,
    long_refs: bool,
    codepage: u16,
}

impl Default for MsiBuilder {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            long_refs: false,
            codepage: 65001,
        }
    }
}

impl MsiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codepage(mut self, codepage: u16) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.push((key.to_string(), value.to_string()));
        self
    }

    pub fn long_refs(mut self) -> Self {
        self.long_refs = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut strings: Vec<String> = Vec::new();
        let mut intern = |s: &str| -> u32 {
            let pos = match strings.iter().position(|x| x == s) {
                Some(pos) => pos,
                None => {
                    strings.push(s.to_string());
                    strings.len() - 1
                }
            };
            (pos + 1) as u32
        };
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, value) in &self.properties {
            keys.push(intern(key));
            values.push(intern(value));
        }

        let encoding = crate::formats::msi::codepage_encoding(u32::from(self.codepage));
        let mut pool = self.codepage.to_le_bytes().to_vec();
        pool.extend_from_slice(&[0x00, if self.long_refs { 0x80 } else { 0x00 }]);
        let mut data = Vec::new();
        for s in &strings {
            let (encoded, _, _) = encoding.encode(s);
            pool.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
            pool.extend_from_slice(&1u16.to_le_bytes());
            data.extend_from_slice(&encoded);
        }

        let mut table = Vec::new();
        for id in keys.iter().chain(values.iter()) {
            table.extend_from_slice(&(*id as u16).to_le_bytes());
            if self.long_refs {
                table.push((id >> 16) as u8);
            }
        }

        CompoundFileBuilder::new()
            .stream(&encode_msi_stream_name("!_StringPool"), pool)
            .stream(&encode_msi_stream_name("!_StringData"), data)
            .stream(&encode_msi_stream_name("!Property"), table)
            .build()
    }
}

pub fn msi(name: &str, version: &str) -> Vec<u8> {
    MsiBuilder::new()
        .property("Manufacturer", "Example Corp")
        .property("ProductName", name)
        .property("ProductVersion", version)
        .property("ProductLanguage", "1033")
        .build()
}

// XAR

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Writes a XAR archive. Paths may contain one directory level.
#[derive(Default)]
pub struct XarBuilder {
    files: Vec<(String, Vec<u8>)>,
    raw: bool,
}

impl XarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores members uncompressed.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.push((path.to_string(), contents.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        // the first 20 heap bytes hold the TOC checksum
        let mut heap = vec![0u8; 20];
        let mut entries = String::new();
        let mut id = 0;
        for (path, contents) in &self.files {
            let encoded = if self.raw { contents.clone() } else { zlib(contents) };
            let style = if self.raw {
                "application/octet-stream"
            } else {
                "application/x-gzip"
            };
            let data = format!(
                "<data><length>{}</length><offset>{}</offset><size>{}</size>\
                 <encoding style=\"{style}\"/></data>",
                encoded.len(),
                heap.len(),
                contents.len()
            );
            heap.extend_from_slice(&encoded);

            id += 1;
            match path.split_once('/') {
                Some((dir, name)) => {
                    entries.push_str(&format!(
                        "<file id=\"{id}\"><name>{dir}</name><type>directory</type>\
                         <file id=\"{}\">{data}<name>{name}</name><type>file</type></file></file>",
                        id + 1
                    ));
                    id += 1;
                }
                None => {
                    entries.push_str(&format!(
                        "<file id=\"{id}\">{data}<name>{path}</name><type>file</type></file>"
                    ));
                }
            }
        }

        let toc = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xar><toc>\
             <checksum style=\"sha1\"><offset>0</offset><size>20</size></checksum>\
             {entries}</toc></xar>"
        );
        let compressed = zlib(toc.as_bytes());

        let mut out = Vec::new();
        out.extend_from_slice(&crate::formats::XAR_MAGIC_BYTES);
        out.extend_from_slice(&28u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&(compressed.len() as u64).to_be_bytes());
        out.extend_from_slice(&(toc.len() as u64).to_be_bytes());
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&compressed);
        out.extend_from_slice(&heap);
        out
    }
}

pub fn pkg(name: &str, version: &str) -> Vec<u8> {
    let distribution = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<installer-gui-script minSpecVersion=\"1\">\
         <title>{name}</title><pkg-ref id=\"com.example.agent\"/>\
         <product id=\"com.example.agent\" version=\"{version}\"/>\
         <pkg-ref id=\"com.example.agent\" version=\"{version}\">#agent.pkg</pkg-ref>\
         </installer-gui-script>"
    );
    let info = format!("<pkg-info identifier=\"com.example.agent\" version=\"{version}\"/>");
    XarBuilder::new()
        .file("Distribution", distribution.as_bytes())
        .file("agent.pkg/PackageInfo", info.as_bytes())
        .file("agent.pkg/Payload", b"payload")
        .build()
}

// Disk image

pub fn dmg(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let mut trailer = vec![0u8; 512];
    trailer[..4].copy_from_slice(b"koly");
    trailer[4..8].copy_from_slice(&4u32.to_be_bytes());
    trailer[8..12].copy_from_slice(&512u32.to_be_bytes());
    out.extend(trailer);
    out
}

// Debian

#[derive(Debug, Clone, Copy)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

pub fn ar(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut out = crate::formats::AR_MAGIC_BYTES.to_vec();
    for (name, data) in members {
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            format!("{name}/"),
            0,
            0,
            0,
            "100644",
            data.len()
        );
        assert_eq!(header.len(), 60);
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    out
}

pub fn tar_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// A package with only `debian-binary` and the control archive.
pub fn deb(control: &str, compression: Compression) -> Vec<u8> {
    let tarball = tar_with(&[("./control", control), ("./md5sums", "")]);
    let (name, member) = match compression {
        Compression::None => ("control.tar", tarball),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&tarball).unwrap();
            ("control.tar.gz", encoder.finish().unwrap())
        }
        Compression::Xz => {
            let mut encoder = XzEncoder::new(Vec::new(), 6);
            encoder.write_all(&tarball).unwrap();
            ("control.tar.xz", encoder.finish().unwrap())
        }
        Compression::Zstd => ("control.tar.zst", zstd::stream::encode_all(tarball.as_slice(), 0).unwrap()),
    };
    ar(&[("debian-binary", b"2.0\n".to_vec()), (name, member)])
}

// RPM

const RPM_TYPE_INT32: u32 = 4;
const RPM_TYPE_STRING: u32 = 6;

fn rpm_header(entries: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut index = Vec::new();
    let mut store = Vec::new();
    for (tag, kind, data) in entries {
        if *kind == RPM_TYPE_INT32 {
            pad_to(&mut store, 4);
        }
        index.extend_from_slice(&tag.to_be_bytes());
        index.extend_from_slice(&kind.to_be_bytes());
        index.extend_from_slice(&(store.len() as u32).to_be_bytes());
        index.extend_from_slice(&1u32.to_be_bytes());
        store.extend_from_slice(data);
    }
    let mut out = vec![0x8e, 0xad, 0xe8, 0x01, 0, 0, 0, 0];
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    out.extend_from_slice(&(store.len() as u32).to_be_bytes());
    out.extend(index);
    out.extend(store);
    out
}

/// Writes lead, signature and main header, without a payload.
#[derive(Default)]
pub struct RpmBuilder {
    entries: Vec<(u32, u32, Vec<u8>)>,
}

impl RpmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, tag: u32, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.entries.push((tag, RPM_TYPE_STRING, data));
        self
    }

    pub fn int32(mut self, tag: u32, value: u32) -> Self {
        self.entries.push((tag, RPM_TYPE_INT32, value.to_be_bytes().to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; 96];
        out[..4].copy_from_slice(&crate::formats::RPM_MAGIC_BYTES);
        out[4] = 3;
        out[9] = 1;
        out[10..20].copy_from_slice(b"fixture-1\0");
        out[77] = 1;
        out[79] = 5;

        out.extend(rpm_header(&[(1000, RPM_TYPE_INT32, 0u32.to_be_bytes().to_vec())]));
        pad_to(&mut out, 8);
        out.extend(rpm_header(&self.entries));
        out
    }
}

pub fn rpm(name: &str, version: &str) -> Vec<u8> {
    RpmBuilder::new()
        .string(1000, name)
        .string(1001, version)
        .string(1002, "1")
        .build()
}

// PE

fn version_block(key: &str, value: &[u8], value_len: u16, text: bool, children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0u8; 6];
    put_u16(&mut out, 2, value_len);
    put_u16(&mut out, 4, u16::from(text));
    out.extend(utf16z(key));
    pad_to(&mut out, 4);
    out.extend_from_slice(value);
    for child in children {
        pad_to(&mut out, 4);
        out.extend_from_slice(child);
    }
    let len = out.len() as u16;
    put_u16(&mut out, 0, len);
    out
}

/// Encodes a `VS_VERSIONINFO` resource with one English string table.
pub fn version_info(strings: &[(&str, &str)], fixed: Option<[u16; 4]>) -> Vec<u8> {
    let strings: Vec<Vec<u8>> = strings
        .iter()
        .map(|(key, value)| {
            let encoded = utf16z(value);
            version_block(key, &encoded, (encoded.len() / 2) as u16, true, &[])
        })
        .collect();
    let table = version_block("040904b0", &[], 0, true, &strings);
    let string_info = version_block("StringFileInfo", &[], 0, true, &[table]);

    let fixed = fixed.map(|[a, b, c, d]| {
        let ms = (u32::from(a) << 16) | u32::from(b);
        let ls = (u32::from(c) << 16) | u32::from(d);
        let mut info = vec![0u8; 52];
        put_u32(&mut info, 0, 0xfeef_04bd);
        put_u32(&mut info, 4, 0x0001_0000);
        put_u32(&mut info, 8, ms);
        put_u32(&mut info, 12, ls);
        put_u32(&mut info, 16, ms);
        put_u32(&mut info, 20, ls);
        put_u32(&mut info, 32, 0x0004);
        put_u32(&mut info, 36, 0x0001);
        info
    });
    let value = fixed.unwrap_or_default();
    version_block("VS_VERSION_INFO", &value, value.len() as u16, false, &[string_info])
}

#[derive(Default)]
pub struct PeBuilder {
    version_info: Option<Vec<u8>>,
    pe32_plus: bool,
    section_padding: usize,
}

impl PeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    pub fn version_info(mut self, info: Vec<u8>) -> Self {
        self.version_info = Some(info);
        self
    }

    /// Zero bytes appended to the resource section after the version data.
    pub fn section_padding(mut self, len: usize) -> Self {
        self.section_padding = len;
        self
    }

    pub fn build(self) -> Vec<u8> {
        const RSRC_RVA: u32 = 0x1000;
        const RAW_OFFSET: usize = 0x200;

        let rsrc = self.version_info.map(|info| {
            let mut rsrc = vec![0u8; 0x58];
            // type directory -> RT_VERSION
            put_u16(&mut rsrc, 14, 1);
            put_u32(&mut rsrc, 16, 16);
            put_u32(&mut rsrc, 20, 0x8000_0000 | 0x18);
            // name directory -> 1
            put_u16(&mut rsrc, 0x18 + 14, 1);
            put_u32(&mut rsrc, 0x18 + 16, 1);
            put_u32(&mut rsrc, 0x18 + 20, 0x8000_0000 | 0x30);
            // language directory -> en-US data entry
            put_u16(&mut rsrc, 0x30 + 14, 1);
            put_u32(&mut rsrc, 0x30 + 16, 0x409);
            put_u32(&mut rsrc, 0x30 + 20, 0x48);
            put_u32(&mut rsrc, 0x48, RSRC_RVA + 0x58);
            put_u32(&mut rsrc, 0x4c, info.len() as u32);
            rsrc.extend(info);
            rsrc.resize(rsrc.len() + self.section_padding, 0);
            rsrc
        });

        let (magic, optional_len, count_at, dirs_at) = if self.pe32_plus {
            (0x20bu16, 240usize, 108usize, 112usize)
        } else {
            (0x10b, 224, 92, 96)
        };

        let mut out = vec![0u8; 0x40];
        out[..2].copy_from_slice(b"MZ");
        put_u32(&mut out, 0x3c, 0x40);
        out.extend_from_slice(b"PE\0\0");

        let mut coff = vec![0u8; 20];
        put_u16(&mut coff, 0, if self.pe32_plus { 0x8664 } else { 0x14c });
        put_u16(&mut coff, 2, u16::from(rsrc.is_some()));
        put_u16(&mut coff, 16, optional_len as u16);
        put_u16(&mut coff, 18, 0x0102);
        out.extend(coff);

        let mut optional = vec![0u8; optional_len];
        put_u16(&mut optional, 0, magic);
        put_u32(&mut optional, count_at, 16);
        if let Some(rsrc) = &rsrc {
            put_u32(&mut optional, dirs_at + 16, RSRC_RVA);
            put_u32(&mut optional, dirs_at + 20, rsrc.len() as u32);
        }
        out.extend(optional);

        if let Some(mut rsrc) = rsrc {
            let virtual_size = rsrc.len() as u32;
            pad_to(&mut rsrc, 0x200);

            let mut section = vec![0u8; 40];
            section[..6].copy_from_slice(b".rsrc\0");
            put_u32(&mut section, 8, virtual_size);
            put_u32(&mut section, 12, RSRC_RVA);
            put_u32(&mut section, 16, rsrc.len() as u32);
            put_u32(&mut section, 20, RAW_OFFSET as u32);
            put_u32(&mut section, 36, 0x4000_0040);
            out.extend(section);

            out.resize(RAW_OFFSET, 0);
            out.extend(rsrc);
        } else {
            pad_to(&mut out, 0x200);
        }
        out
    }
}

pub fn exe(name: &str, version: &str) -> Vec<u8> {
    let info = version_info(
        &[
            ("CompanyName", "Example Corp"),
            ("FileDescription", "Installer"),
            ("ProductName", name),
            ("ProductVersion", version),
        ],
        Some([1, 0, 0, 0]),
    );
    PeBuilder::new().version_info(info).build()
}
