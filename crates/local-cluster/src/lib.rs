pub mod cli;
pub mod config;
pub mod errors;
pub mod launcher;
pub mod logger;
pub mod process;
pub mod reaper;

pub use config::{generate_config, ClusterConfig, LaunchSettings};
pub use errors::{Error, Result};
pub use launcher::{Launcher, ShutdownReason, Status};
pub use reaper::{parse_listener_pids, PortReaper};

#[cfg(test)]
mod test_utils;
