// Cluster configuration module.
// Settings for one harness run, plus the JSON file that tells servers,
// clients and the benchmark where every server listens.

use std::{path::{Path, PathBuf}, time::Duration};
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::errors::{Error, Result};

pub const DEFAULT_BASE_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "localhost";

// Long enough that only an interrupt ends a run in practice.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(100_000);

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub server_count: usize,
    pub base_port: u16,
    pub config_dir: PathBuf,
    pub server_binary: PathBuf,
    pub server_subcommand: String,
    pub benchmark_script: PathBuf,
    pub inspector: String,
    pub hold: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            server_count: 1,
            base_port: DEFAULT_BASE_PORT,
            config_dir: PathBuf::from("config"),
            server_binary: PathBuf::from("./cs598fts"),
            server_subcommand: "server".to_string(),
            benchmark_script: PathBuf::from("./script/benchmark.sh"),
            inspector: "lsof".to_string(),
            hold: DEFAULT_HOLD,
        }
    }
}

impl LaunchSettings {
    pub fn with_server_count(server_count: usize) -> Self {
        Self { server_count, ..Self::default() }
    }

    // Contiguous, ascending, starting at the base port.
    pub fn ports(&self) -> Result<Vec<u16>> {
        if self.server_count == 0 {
            return Err(Error::InvalidConfig("server count must be at least 1".into()));
        }

        let last = self.base_port as usize + self.server_count - 1;
        if last > u16::MAX as usize {
            return Err(Error::PortRange { base: self.base_port, count: self.server_count });
        }

        Ok((0..self.server_count).map(|i| self.base_port + i as u16).collect())
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(format!("local-{}.json", self.server_count))
    }
}

/// Contents of `local-<n>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub server: Vec<String>,
}

impl ClusterConfig {
    pub fn from_ports(ports: &[u16]) -> Self {
        let server = ports
            .iter()
            .map(|port| format!("{}:{}", DEFAULT_HOST, port))
            .collect();
        Self { server }
    }

    /// Two-space indented JSON without a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a config back the way clients of the cluster do.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| Error::ConfigRead { path: path.to_path_buf(), source })?;

        let config: ClusterConfig = serde_json::from_str(&content)?;
        if config.server.is_empty() {
            return Err(Error::InvalidConfig(format!("{:?} lists no servers", path)));
        }

        Ok(config)
    }
}

/// Write the cluster config for `settings`, overwriting any earlier file for
/// the same server count. The directory must already exist.
pub fn generate_config(settings: &LaunchSettings) -> Result<PathBuf> {
    let ports = settings.ports()?;
    let json = ClusterConfig::from_ports(&ports).to_json()?;

    let path = settings.config_path();
    std::fs::write(&path, json)
        .map_err(|source| Error::ConfigWrite { path: path.clone(), source })?;

    info!("Generate config to {}", path.display());
    Ok(path)
}
