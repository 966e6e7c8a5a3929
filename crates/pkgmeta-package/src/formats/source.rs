//! Bounded, seekable view over the artifact being parsed.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Take};

use crate::error::{malformed, ParseError, ParseResult};

/// A readable, seekable artifact of known length.
///
/// Offsets are relative to the start of the artifact. Every read is checked
/// against the artifact length, so offsets taken from a corrupt container
/// surface as [`ParseError::Malformed`] instead of short reads, and buffered
/// members are capped at `max_member` bytes.
pub struct Source<'a, R> {
    inner: &'a mut R,
    base: u64,
    len: u64,
    max_member: u64,
}

fn eof_as_malformed(err: io::Error) -> ParseError {
    if err.kind() == ErrorKind::UnexpectedEof {
        malformed("unexpected end of data")
    } else {
        ParseError::Io(err)
    }
}

impl<'a, R: Read + Seek> Source<'a, R> {
    pub fn new(inner: &'a mut R, base: u64, len: u64, max_member: u64) -> Self {
        Self {
            inner,
            base,
            len,
            max_member,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn check_range(&self, offset: u64, len: u64) -> ParseResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => {
                Err(malformed(format!(
                    "{len} bytes at offset {offset} exceed the file length of {}",
                    self.len
                )))
            }
        }
    }

    /// Rejects buffering `len` bytes for a single member.
    pub fn check_member(&self, len: u64, what: &str) -> ParseResult<()> {
        if len > self.max_member {
            return Err(malformed(format!(
                "{what} of {len} bytes exceeds the {} byte limit",
                self.max_member
            )));
        }
        Ok(())
    }

    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> ParseResult<()> {
        self.check_range(offset, buf.len() as u64)?;
        self.inner.seek(SeekFrom::Start(self.base + offset))?;
        self.inner.read_exact(buf).map_err(eof_as_malformed)
    }

    /// Reads exactly `len` bytes at `offset`.
    pub fn read_at(&mut self, offset: u64, len: u64) -> ParseResult<Vec<u8>> {
        self.check_member(len, "read")?;
        self.check_range(offset, len)?;
        let mut buf = vec![0u8; len as usize];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }

    pub fn starts_with(&mut self, magic: &[u8]) -> ParseResult<bool> {
        if self.len < magic.len() as u64 {
            return Ok(false);
        }
        Ok(self.read_at(0, magic.len() as u64)? == magic)
    }

    /// Positions the source at `offset` and returns a reader limited to `len`
    /// bytes, for members that are decoded as a stream.
    pub fn take_at(&mut self, offset: u64, len: u64) -> ParseResult<Take<&mut R>> {
        self.check_range(offset, len)?;
        self.inner.seek(SeekFrom::Start(self.base + offset))?;
        Ok((&mut *self.inner).take(len))
    }

    pub fn max_member(&self) -> u64 {
        self.max_member
    }
}
