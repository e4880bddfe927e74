/// `load_config` module: reads the optional YAML settings file.
///
/// Every key is optional. Values found here sit between command-line flags
/// (and their `TRANSPORTER_*` environment variables) and built-in defaults;
/// the merge itself happens in [`crate::cli::Cli::settings`].
///
/// # Accepted keys
/// `src`, `bucket`, `prefix`, `parallels`, `port`, `gzip`, `gzip_level`,
/// `time_format`, `time_zone`, `region`, `endpoint_url`.
///
/// Unknown keys are rejected so that typos surface at startup instead of
/// being silently ignored.
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub src: Option<PathBuf>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub parallels: Option<usize>,
    pub port: Option<u16>,
    pub gzip: Option<bool>,
    pub gzip_level: Option<u32>,
    pub time_format: Option<String>,
    /// `local`, `utc` or a fixed offset such as `+09:00`.
    pub time_zone: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Loads the YAML settings file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {}: {e}",
                path_ref.display()
            ));
        }
    };

    // an empty file is a valid, empty config
    if config_content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty, using flags and defaults");
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str::<FileConfig>(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!(
                "Failed to parse config YAML {}: {e}",
                path_ref.display()
            ))
        }
    }
}
