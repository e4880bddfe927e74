use clap::Parser;
use s3mover::cli::{Cli, DEFAULT_PORT};
use s3mover::load_config::{load_config, FileConfig};
use s3mover_core::key::{KeyTimeZone, DEFAULT_TIME_FORMAT};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn nine_hours_east() -> KeyTimeZone {
    "+09:00".parse().expect("valid offset")
}

fn clear_transporter_env() {
    for (key, _) in env::vars() {
        if key.starts_with("TRANSPORTER_") {
            env::remove_var(key);
        }
    }
}

fn yaml_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), content).unwrap();
    file
}

#[test]
fn test_load_config_reads_every_key() {
    let file = yaml_file(
        r#"
src: /var/spool/s3mover
bucket: my-bucket
prefix: app/logs
parallels: 4
port: 10000
gzip: true
gzip_level: 9
time_format: "%Y-%m-%d"
time_zone: utc
region: ap-northeast-1
endpoint_url: http://localhost:9000
"#,
    );

    let config = load_config(file.path()).expect("Config should load");
    assert_eq!(
        config,
        FileConfig {
            src: Some(PathBuf::from("/var/spool/s3mover")),
            bucket: Some("my-bucket".into()),
            prefix: Some("app/logs".into()),
            parallels: Some(4),
            port: Some(10000),
            gzip: Some(true),
            gzip_level: Some(9),
            time_format: Some("%Y-%m-%d".into()),
            time_zone: Some("utc".into()),
            region: Some("ap-northeast-1".into()),
            endpoint_url: Some("http://localhost:9000".into()),
        }
    );
}

#[test]
fn test_load_config_empty_file_is_default() {
    let file = yaml_file("\n");
    assert_eq!(load_config(file.path()).unwrap(), FileConfig::default());
}

#[test]
fn test_load_config_rejects_unknown_keys() {
    let file = yaml_file("bucket: b\nparalels: 3\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(
        err.to_string().contains("Failed to parse config YAML"),
        "got {err}"
    );
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"), "got {err}");
}

#[test]
#[serial]
fn test_settings_precedence_flag_env_file_default() {
    clear_transporter_env();
    let file = yaml_file(
        r#"
src: /from/yaml
bucket: yaml-bucket
prefix: yaml/prefix
parallels: 4
gzip: true
time_zone: "+09:00"
port: 10000
"#,
    );
    env::set_var("TRANSPORTER_PREFIX", "env/prefix");

    let cli = Cli::try_parse_from([
        "s3mover",
        "--config",
        file.path().to_str().unwrap(),
        "--bucket",
        "cli-bucket",
    ])
    .expect("arguments should parse");
    let settings = cli.settings().expect("settings should resolve");
    clear_transporter_env();

    let transport = &settings.transport;
    assert_eq!(transport.bucket, "cli-bucket", "flag beats file");
    assert_eq!(transport.key_prefix, "env/prefix", "env beats file");
    assert_eq!(transport.src_dir, PathBuf::from("/from/yaml"));
    assert_eq!(transport.max_parallels, 4);
    assert!(transport.gzip);
    assert_eq!(transport.gzip_level, 6, "default level");
    assert_eq!(transport.time_zone, nine_hours_east());
    assert_eq!(transport.time_format, DEFAULT_TIME_FORMAT);
    assert_eq!(settings.port, 10000);
    assert!(settings.s3.endpoint_url.is_none());
}

#[test]
#[serial]
fn test_settings_defaults_without_file() {
    clear_transporter_env();
    let cli = Cli::try_parse_from([
        "s3mover", "--src", "/tmp/in", "--bucket", "b", "--prefix", "p",
    ])
    .unwrap();
    let settings = cli.settings().unwrap();

    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.transport.max_parallels, 1);
    assert!(!settings.transport.gzip);
    assert_eq!(settings.transport.time_zone, KeyTimeZone::Local);
    assert_eq!(cli.log_level, "info");
}

#[test]
#[serial]
fn test_settings_gzip_flag_without_value_enables_compression() {
    clear_transporter_env();
    let cli = Cli::try_parse_from([
        "s3mover", "--src", "/tmp/in", "--bucket", "b", "--prefix", "p", "--gzip",
        "--time-zone", "utc",
    ])
    .unwrap();
    let settings = cli.settings().unwrap();
    assert!(settings.transport.gzip);
    assert_eq!(settings.transport.time_zone, KeyTimeZone::Utc);
}

#[test]
#[serial]
fn test_settings_rejects_bad_time_zone_in_file() {
    clear_transporter_env();
    let file = yaml_file("src: /x\nbucket: b\nprefix: p\ntime_zone: mars\n");
    let cli = Cli::try_parse_from(["s3mover", "--config", file.path().to_str().unwrap()]).unwrap();
    let err = cli.settings().unwrap_err();
    assert!(format!("{err:#}").contains("time_zone"), "got {err:#}");
}
