use crate::error::{BytesError, BytesResult};

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Formats a byte count with binary units, e.g. `1.50 MiB`.
///
/// # Example
///
/// ```
/// use pkgmeta_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(3 * 1024 * 1024 / 2, 2), "1.50 MiB");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let mut value = bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    format!("{value:.precision$} {}", UNITS[idx])
}

/// Parses a human-readable size such as `64 KiB`, `16MB` or `4096`.
///
/// Binary suffixes (`KiB`, `MiB`, ...) scale by 1024, decimal ones (`KB`,
/// `MB`, ...) by 1000. A bare number is taken as bytes.
///
/// # Errors
///
/// * [`BytesError::ParseFailed`] if the number or suffix is not recognized.
pub fn parse_bytes(s: &str) -> BytesResult<u64> {
    let input = s.trim();
    if let Ok(v) = input.parse::<u64>() {
        return Ok(v);
    }

    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);
    let fail = |reason: &str| {
        BytesError::ParseFailed {
            input: s.to_string(),
            reason: reason.to_string(),
        }
    };

    let number: f64 = number.parse().map_err(|_| fail("Invalid number"))?;
    let suffix = suffix.trim().to_ascii_uppercase();

    let (prefix, base) = if let Some(p) = suffix.strip_suffix("IB") {
        (p, 1024_f64)
    } else if let Some(p) = suffix.strip_suffix('B') {
        (p, 1000_f64)
    } else {
        return Err(fail("Invalid suffix"));
    };

    let power = match prefix {
        "" => 0,
        "K" => 1,
        "M" => 2,
        "G" => 3,
        "T" => 4,
        "P" => 5,
        "E" => 6,
        _ => return Err(fail("Unrecognized size format")),
    };

    Ok((number * base.powi(power)).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 0), "0 B");
        assert_eq!(format_bytes(1023, 0), "1023 B");
        assert_eq!(format_bytes(1024, 1), "1.0 KiB");
        assert_eq!(format_bytes(1536, 2), "1.50 KiB");
        assert_eq!(format_bytes(64 * 1024_u64.pow(2), 0), "64 MiB");
        assert_eq!(format_bytes(5 * 1024_u64.pow(3) / 2, 1), "2.5 GiB");
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("42").unwrap(), 42);
        assert_eq!(parse_bytes(" 120 ").unwrap(), 120);
        assert_eq!(parse_bytes("1B").unwrap(), 1);
        assert_eq!(parse_bytes("64 KiB").unwrap(), 64 * 1024);
        assert_eq!(parse_bytes("1.50KiB").unwrap(), 1536);
        assert_eq!(parse_bytes("16MB").unwrap(), 16_000_000);
        assert_eq!(parse_bytes("64 mib").unwrap(), 64 * 1024_u64.pow(2));
        assert_eq!(parse_bytes("1GiB").unwrap(), 1024_u64.pow(3));
    }

    #[test]
    fn test_fail_parse_bytes() {
        assert!(parse_bytes("1.xE").is_err());
        assert!(parse_bytes("1.50FB").is_err());
        assert!(parse_bytes(" MiB ").is_err());
        assert!(parse_bytes("12 bits").is_err());
    }
}
