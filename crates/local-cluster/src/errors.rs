//! Error types for the local cluster harness.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cluster config could not be written (missing directory, permissions)
    #[error("failed to write cluster config {path:?}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read cluster config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid cluster config: {0}")]
    InvalidConfig(String),

    /// `count` servers starting at `base` would run past the last TCP port
    #[error("{count} servers starting at port {base} exceed the TCP port range")]
    PortRange { base: u16, count: usize },

    /// The port inspection utility could not be run at all
    #[error("failed to run port inspector `{program}`: {source}")]
    Inspector {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("port inspector row has a non-numeric process id: {line:?}")]
    InvalidPid { line: String },

    #[error("failed to send SIGKILL to process {pid}: {source}")]
    Kill {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("failed to terminate {label}: {source}")]
    Terminate {
        label: String,
        #[source]
        source: std::io::Error,
    },
}
