use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use nu_ansi_term::Color;

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn color_enabled() -> bool {
    COLOR.read().map(|c| *c).unwrap_or(true)
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if color_enabled() {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Shortens a hex digest for tables, keeping both ends.
pub fn abbreviate_hash(hex: &str, keep: usize) -> String {
    if hex.len() <= keep * 2 + 1 {
        return hex.to_string();
    }
    format!("{}…{}", &hex[..keep], &hex[hex.len() - keep..])
}
