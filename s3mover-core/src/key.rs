//! Object key generation.
//!
//! Keys are `<prefix>/<formatted mtime>/<filename>[.gz]`. The timestamp is the
//! file's modification time rendered in a fixed, process-wide zone, so a retried
//! upload of an unchanged file lands on the same key.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Default `strftime` pattern used when no time format is configured.
pub const DEFAULT_TIME_FORMAT: &str = "%Y/%m/%d/%H/%M";

/// Suffix appended to keys of gzip-compressed objects.
pub const GZIP_SUFFIX: &str = ".gz";

/// Zone in which modification times are rendered into keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTimeZone {
    /// The host's local zone.
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl KeyTimeZone {
    /// Renders `timestamp` in this zone using the `strftime` pattern `format`.
    ///
    /// Panics on patterns chrono cannot render; configs go through
    /// [`crate::config::TransportConfig::validate`] first.
    pub fn format(&self, timestamp: SystemTime, format: &str) -> String {
        let utc: DateTime<Utc> = timestamp.into();
        match self {
            KeyTimeZone::Local => utc.with_timezone(&Local).format(format).to_string(),
            KeyTimeZone::Utc => utc.format(format).to_string(),
            KeyTimeZone::Fixed(offset) => utc.with_timezone(offset).format(format).to_string(),
        }
    }
}

impl fmt::Display for KeyTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTimeZone::Local => f.write_str("local"),
            KeyTimeZone::Utc => f.write_str("utc"),
            KeyTimeZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for KeyTimeZone {
    type Err = String;

    /// Accepts `local`, `utc` (or `z`) and offsets such as `+09:00` or `-0530`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(KeyTimeZone::Local),
            "utc" | "z" => Ok(KeyTimeZone::Utc),
            other => parse_offset(other)
                .map(KeyTimeZone::Fixed)
                .ok_or_else(|| format!("invalid time zone {s:?}: expected local, utc or ±HH:MM")),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Builds the object key for `filename`.
///
/// Empty `prefix` is skipped; empty `time_format` falls back to [`DEFAULT_TIME_FORMAT`].
/// `filename` is used verbatim.
pub fn generate_key(
    prefix: &str,
    filename: &str,
    timestamp: SystemTime,
    gzip: bool,
    time_format: &str,
    tz: KeyTimeZone,
) -> String {
    let time_format = if time_format.is_empty() {
        DEFAULT_TIME_FORMAT
    } else {
        time_format
    };
    let stamp = tz.format(timestamp, time_format);

    let mut key = [prefix, stamp.as_str()]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .chain(std::iter::once(filename))
        .collect::<Vec<_>>()
        .join("/");
    if gzip {
        key.push_str(GZIP_SUFFIX);
    }
    key
}
