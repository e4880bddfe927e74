use std::fmt::Write;
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::key::{KeyTimeZone, DEFAULT_TIME_FORMAT};

/// Default number of concurrent upload jobs.
pub const DEFAULT_MAX_PARALLELS: usize = 1;

/// Gzip level used when compression is enabled without an explicit level.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Settings consumed by the transport engine. Validated once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub src_dir: PathBuf,
    pub bucket: String,
    pub key_prefix: String,
    pub max_parallels: usize,
    pub gzip: bool,
    pub gzip_level: u32,
    /// `strftime` pattern for the time part of object keys.
    pub time_format: String,
    pub time_zone: KeyTimeZone,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::new(),
            bucket: String::new(),
            key_prefix: String::new(),
            max_parallels: DEFAULT_MAX_PARALLELS,
            gzip: false,
            gzip_level: DEFAULT_GZIP_LEVEL,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            time_zone: KeyTimeZone::Local,
        }
    }
}

impl TransportConfig {
    /// Checks required fields and normalises the gzip level.
    pub fn validate(&mut self) -> Result<(), TransportError> {
        if self.bucket.is_empty() {
            return Err(TransportError::Config("bucket is required".into()));
        }
        if self.key_prefix.is_empty() {
            return Err(TransportError::Config("prefix is required".into()));
        }
        if self.src_dir.as_os_str().is_empty() {
            return Err(TransportError::Config("src is required".into()));
        }
        if self.max_parallels == 0 {
            return Err(TransportError::Config("parallels must be at least 1".into()));
        }
        check_time_format(&self.time_format)?;
        if self.gzip {
            if self.gzip_level == 0 {
                self.gzip_level = DEFAULT_GZIP_LEVEL;
            }
            if !(1..=9).contains(&self.gzip_level) {
                return Err(TransportError::Config(
                    "gzip level must be between 1 and 9".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            src = %self.src_dir.display(),
            bucket = %self.bucket,
            prefix = %self.key_prefix,
            parallels = self.max_parallels,
            gzip = self.gzip,
            time_format = %self.time_format,
            time_zone = %self.time_zone,
            "Loaded transport config"
        );
        debug!(?self, "Transport config loaded (full debug)");
    }
}

/// Rejects `strftime` patterns chrono cannot render. Empty means the default.
fn check_time_format(format: &str) -> Result<(), TransportError> {
    if format.is_empty() {
        return Ok(());
    }
    let invalid = || TransportError::Config(format!("invalid time format {format:?}"));
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    let mut rendered = String::new();
    write!(rendered, "{}", DateTime::<Utc>::default().format(format)).map_err(|_| invalid())?;
    Ok(())
}
