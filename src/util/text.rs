use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};

/// Characters that providers sprinkle into numbers: thousands separators,
/// percent signs and assorted whitespace.
const NUMBER_ESCAPE_CHAR: [char; 6] = [',', '%', ' ', '\u{a0}', '\t', '\n'];

/// Parses an `f64` value from text scraped or deserialized from a provider.
///
/// Thousands separators, percent signs and whitespace are removed first, so
/// `"1,234.50"`, `" 1234.5 "` and `"1234.50"` all yield the same value. Any
/// extra characters in `escape_chars` are removed as well.
///
/// # Example
///
/// ```
/// let v = parse_f64("(+1.25%)", Some(vec!['(', ')', '+'])).unwrap();
/// assert_eq!(v, 1.25);
/// ```
pub fn parse_f64(s: &str, escape_chars: Option<Vec<char>>) -> Result<f64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    let value = f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because {:?}", cleaned, why))?;

    if !value.is_finite() {
        return Err(anyhow!("'{}' is not a finite number", cleaned));
    }

    Ok(value)
}

/// Parses an `i64` value, with the same cleanup as [`parse_f64`].
pub fn parse_i64(s: &str, escape_chars: Option<Vec<char>>) -> Result<i64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// Rewrites a decimal-comma number (`128.431,20`) into decimal-point form
/// (`128431.20`) ahead of [`parse_f64`].
pub fn decimal_comma_to_point(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.trim().chars().filter(|c| !filters.contains(c)).collect()
}
