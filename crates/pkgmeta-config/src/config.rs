use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, RwLock},
};

use pkgmeta_utils::bytes::parse_bytes;
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const DEFAULT_SNIFF_LEN: usize = 512;
pub const DEFAULT_HASH_CHUNK_SIZE: u64 = 64 * 1024;
pub const DEFAULT_MAX_MEMBER_SIZE: u64 = 64 * 1024 * 1024;

/// Smallest prefix that still covers every magic number we sniff.
const MIN_SNIFF_LEN: usize = 8;

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("PKGMETA_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("pkgmeta").join("config.toml"),
    })
});

fn xdg_config_home() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(u64),
    Human(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Bytes(n) => Ok(n),
        SizeRepr::Human(s) => parse_bytes(&s).map_err(de::Error::custom),
    }
}

/// Tunables for installer metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Bytes read from the start of an artifact for content sniffing.
    /// Default: 512
    pub sniff_len: usize,

    /// Read size used while streaming content through the digest.
    /// Accepts a byte count or a string such as "64 KiB".
    /// Default: 65536
    #[serde(deserialize_with = "deserialize_size")]
    pub hash_chunk_size: u64,

    /// Largest single metadata member (decompressed control archive, TOC,
    /// property stream, version resource) an extractor will buffer.
    /// Default: 67108864
    #[serde(deserialize_with = "deserialize_size")]
    pub max_member_size: u64,

    /// Report RPM versions as `VERSION-RELEASE` instead of `VERSION`.
    /// Default: false
    pub rpm_include_release: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            sniff_len: DEFAULT_SNIFF_LEN,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
            max_member_size: DEFAULT_MAX_MEMBER_SIZE,
            rpm_include_release: false,
        }
    }
}

impl ExtractConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Loads the configuration at `path`, falling back to the defaults when
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading configuration");
                Self::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::IoError(err)),
        }
    }

    /// Loads from [`CONFIG_PATH`].
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH
            .read()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|poisoned| poisoned.into_inner().to_path_buf());
        Self::load(config_path)
    }

    /// Validates value ranges.
    pub fn resolve(&mut self) -> Result<()> {
        if self.sniff_len < MIN_SNIFF_LEN {
            return Err(ConfigError::InvalidValue {
                field: "sniff_len",
                reason: format!("must be at least {MIN_SNIFF_LEN} bytes"),
            });
        }
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hash_chunk_size",
                reason: "must be greater than zero".into(),
            });
        }
        if usize::try_from(self.hash_chunk_size).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "hash_chunk_size",
                reason: "does not fit in memory on this platform".into(),
            });
        }
        if self.max_member_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_member_size",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn hash_chunk_size(&self) -> usize {
        usize::try_from(self.hash_chunk_size).unwrap_or(usize::MAX)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
