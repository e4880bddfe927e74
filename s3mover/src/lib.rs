pub mod cli;
pub mod load_config;
pub mod logging;
pub mod s3;
pub mod shutdown;
pub mod stats_server;

pub use cli::{run, run_with, Cli, Settings};
