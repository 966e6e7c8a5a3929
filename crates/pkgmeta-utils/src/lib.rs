//! Shared utilities for pkgmeta: streaming SHA-256 fingerprints, human byte
//! sizes and the small filesystem helpers used around artifact storage.

pub mod bytes;
pub mod error;
pub mod fs;
pub mod hash;
