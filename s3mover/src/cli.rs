/// # s3mover CLI Interface (Module)
///
/// Command-line parsing, settings resolution and process orchestration for the
/// `s3mover` binary. The transport engine itself lives in [`s3mover_core`];
/// this module only wires it to S3, the stats server and signal handling.
///
/// ## Settings precedence
/// 1. command-line flag, or its `TRANSPORTER_*` environment variable
/// 2. the YAML file given with `--config`
/// 3. built-in defaults
///
/// ## How To Use
/// - From the shell: `s3mover --src /var/spool/logs --bucket my-bucket --prefix app/logs`.
/// - Programmatically: build a [`Settings`] and call [`run_with`] with any
///   [`ObjectStore`], which is what the integration tests do.
use crate::load_config::{load_config, FileConfig};
use crate::logging::LogFormat;
use crate::s3::{S3ObjectStore, S3Settings};
use crate::shutdown::cancel_on_signal;
use crate::stats_server;
use anyhow::{Context, Result};
use clap::Parser;
use s3mover_core::config::DEFAULT_GZIP_LEVEL;
use s3mover_core::key::KeyTimeZone;
use s3mover_core::{ObjectStore, TransportConfig, Transporter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default port of the stats server.
pub const DEFAULT_PORT: u16 = 9898;

/// Move files dropped into a directory to S3.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "s3mover",
    version,
    about = "Upload every file written to a directory into an S3 bucket, then delete it locally"
)]
pub struct Cli {
    /// Source directory to watch
    #[arg(long, env = "TRANSPORTER_SRC")]
    pub src: Option<PathBuf>,

    /// Destination bucket name
    #[arg(long, env = "TRANSPORTER_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix for every uploaded object
    #[arg(long, env = "TRANSPORTER_PREFIX")]
    pub prefix: Option<String>,

    /// Maximum number of concurrent uploads [default: 1]
    #[arg(long, env = "TRANSPORTER_PARALLELS")]
    pub parallels: Option<usize>,

    /// Stats server port [default: 9898]
    #[arg(long, env = "TRANSPORTER_PORT")]
    pub port: Option<u16>,

    /// Gzip each file before upload and append `.gz` to its key
    #[arg(long, env = "TRANSPORTER_GZIP", num_args = 0..=1, default_missing_value = "true")]
    pub gzip: Option<bool>,

    /// Gzip compression level, 1-9 [default: 6]
    #[arg(long, env = "TRANSPORTER_GZIP_LEVEL")]
    pub gzip_level: Option<u32>,

    /// strftime pattern for the time part of keys [default: %Y/%m/%d/%H/%M]
    #[arg(long, env = "TRANSPORTER_TIME_FORMAT")]
    pub time_format: Option<String>,

    /// Time zone for the time part of keys: local, utc or +HH:MM [default: local]
    #[arg(long, env = "TRANSPORTER_TIME_ZONE")]
    pub time_zone: Option<KeyTimeZone>,

    /// AWS region (falls back to the AWS provider chain)
    #[arg(long, env = "TRANSPORTER_REGION")]
    pub region: Option<String>,

    /// Custom S3 endpoint for S3-compatible services
    #[arg(long, env = "TRANSPORTER_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Log level or tracing filter directive
    #[arg(long, env = "TRANSPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "TRANSPORTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Auto)]
    pub log_format: LogFormat,

    /// Optional YAML settings file
    #[arg(long, env = "TRANSPORTER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved and validated process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub transport: TransportConfig,
    pub port: u16,
    pub s3: S3Settings,
}

impl Cli {
    /// Merges flags, the optional YAML file and defaults, then validates.
    pub fn settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: FileConfig) -> Result<Settings> {
        let defaults = TransportConfig::default();

        let time_zone = match (self.time_zone, &file.time_zone) {
            (Some(tz), _) => tz,
            (None, Some(raw)) => raw
                .parse::<KeyTimeZone>()
                .map_err(anyhow::Error::msg)
                .context("invalid time_zone in config file")?,
            (None, None) => defaults.time_zone,
        };

        let mut transport = TransportConfig {
            src_dir: self.src.clone().or(file.src).unwrap_or_default(),
            bucket: self.bucket.clone().or(file.bucket).unwrap_or_default(),
            key_prefix: self.prefix.clone().or(file.prefix).unwrap_or_default(),
            max_parallels: self
                .parallels
                .or(file.parallels)
                .unwrap_or(defaults.max_parallels),
            gzip: self.gzip.or(file.gzip).unwrap_or(defaults.gzip),
            gzip_level: self
                .gzip_level
                .or(file.gzip_level)
                .unwrap_or(DEFAULT_GZIP_LEVEL),
            time_format: self
                .time_format
                .clone()
                .or(file.time_format)
                .unwrap_or(defaults.time_format),
            time_zone,
        };
        transport.validate().context("invalid configuration")?;

        Ok(Settings {
            transport,
            port: self.port.or(file.port).unwrap_or(DEFAULT_PORT),
            s3: S3Settings {
                region: self.region.clone().or(file.region),
                endpoint_url: self.endpoint_url.clone().or(file.endpoint_url),
            },
        })
    }
}

/// Async CLI entrypoint used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings()?;
    settings.transport.trace_loaded();

    let store = S3ObjectStore::connect(&settings.s3).await;
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    run_with(settings, Arc::new(store), cancel).await
}

/// Runs the transporter and the stats server until `cancel` fires or the
/// transporter fails to start.
pub async fn run_with<S: ObjectStore + 'static>(
    settings: Settings,
    store: Arc<S>,
    cancel: CancellationToken,
) -> Result<()> {
    let transporter = Transporter::new(settings.transport, store);

    let listener = TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("failed to bind stats server to port {}", settings.port))?;
    let server = stats_server::serve(listener, transporter.metrics(), cancel.clone());

    let engine = async {
        let result = transporter.start(&cancel).await;
        // stop the stats server too when the engine gives up
        cancel.cancel();
        result
    };

    let (engine_result, server_result) = tokio::join!(engine, server);
    engine_result.context("transporter failed")?;
    server_result.context("stats server failed")?;
    info!("all components stopped");
    Ok(())
}
