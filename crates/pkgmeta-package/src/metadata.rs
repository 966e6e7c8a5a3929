use std::fmt;

use serde::{Serialize, Serializer};

use crate::{formats::FormatId, traits::PackageExt};

/// Digest used for fingerprints. Part of the stored-data contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and version as decoded by a format extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

impl PackageIdentity {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, version: V) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub(crate) fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            version: self.version.trim().to_string(),
        }
    }
}

impl PackageExt for PackageIdentity {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Identity and fingerprint of one installer artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallerMetadata {
    /// Software name, never empty.
    pub name: String,
    /// Version string exactly as encoded; empty when unavailable.
    pub version: String,
    /// Format the artifact was parsed as.
    pub format: FormatId,
    pub hash_algorithm: HashAlgorithm,
    /// Digest of every byte of the input.
    #[serde(serialize_with = "serialize_hex")]
    pub hash: Vec<u8>,
    /// Number of bytes hashed.
    pub size: u64,
}

impl InstallerMetadata {
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

impl PackageExt for InstallerMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}
