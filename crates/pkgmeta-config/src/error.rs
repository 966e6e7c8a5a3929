use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(pkgmeta_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(pkgmeta_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    #[diagnostic(
        code(pkgmeta_config::invalid_value),
        help("Sizes accept plain byte counts or strings such as \"64 KiB\"")
    )]
    InvalidValue { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(pkgmeta_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
