use std::{path::PathBuf, time::Duration};
use clap::Parser;
use crate::config::{LaunchSettings, DEFAULT_BASE_PORT, DEFAULT_HOLD};

/// Start a local cluster of servers plus the benchmark, and clean them up on Ctrl+C.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of servers to launch.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub num_server: u16,

    /// Port of the first server; the rest follow sequentially.
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    pub base_port: u16,

    /// Directory that receives `local-<num_server>.json`. Must exist.
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    #[arg(long, default_value = "./cs598fts")]
    pub server_binary: PathBuf,

    #[arg(long, default_value = "server")]
    pub server_subcommand: String,

    #[arg(long, default_value = "./script/benchmark.sh")]
    pub benchmark_script: PathBuf,

    /// Port inspection utility, invoked as `<inspector> -i :<port>`.
    #[arg(long, default_value = "lsof")]
    pub inspector: String,

    /// Seconds to hold the cluster up before shutting down on our own.
    #[arg(long, default_value_t = DEFAULT_HOLD.as_secs())]
    pub hold_secs: u64,

    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl From<Args> for LaunchSettings {
    fn from(args: Args) -> Self {
        Self {
            server_count: args.num_server as usize,
            base_port: args.base_port,
            config_dir: args.config_dir,
            server_binary: args.server_binary,
            server_subcommand: args.server_subcommand,
            benchmark_script: args.benchmark_script,
            inspector: args.inspector,
            hold: Duration::from_secs(args.hold_secs),
        }
    }
}
