// Port reaper.
// Frees a TCP port by force-killing every process the OS reports on it.
// It cannot tell our own servers from unrelated listeners: anything on
// the port dies.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use crate::errors::{Error, Result};

/// OS access needed by the reaper.
#[allow(async_fn_in_trait)]
pub trait PortInspector {
    /// Raw tabular listing of processes holding a socket on `port`,
    /// header line first.
    async fn listeners(&self, port: u16) -> Result<String>;

    /// Send SIGKILL to `pid`. `Ok(false)` means the signal was not
    /// delivered, usually because the process is already gone.
    async fn kill(&self, pid: u32) -> Result<bool>;
}

/// `lsof -i :<port>` for listing, `kill -9 <pid>` for killing.
#[derive(Debug, Clone)]
pub struct Lsof {
    program: String,
}

impl Lsof {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl PortInspector for Lsof {
    async fn listeners(&self, port: u16) -> Result<String> {
        // lsof exits 1 when nothing matches, so only the output counts.
        let output = Command::new(&self.program)
            .arg("-i")
            .arg(format!(":{}", port))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Inspector { program: self.program.clone(), source })?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn kill(&self, pid: u32) -> Result<bool> {
        let status = Command::new("kill")
            .arg("-9")
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| Error::Kill { pid, source })?;

        Ok(status.success())
    }
}

/// Process ids from an lsof-style listing.
///
/// The first line is a header. Rows with fewer than two whitespace separated
/// tokens are skipped; otherwise the second token must be the pid. A process
/// with several sockets on the port is reported once, in first-seen order.
pub fn parse_listener_pids(listing: &str) -> Result<Vec<u32>> {
    let mut pids = Vec::new();

    for line in listing.lines().skip(1) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }

        let pid = tokens[1]
            .parse::<u32>()
            .map_err(|_| Error::InvalidPid { line: line.to_string() })?;

        if !pids.contains(&pid) {
            pids.push(pid);
        }
    }

    Ok(pids)
}

pub struct PortReaper<I> {
    inspector: I,
}

impl<I: PortInspector> PortReaper<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }

    /// Kill every process listening on `port` and return the pids that were
    /// signalled. A free port is not an error.
    pub async fn free_port(&self, port: u16) -> Result<Vec<u32>> {
        let listing = self.inspector.listeners(port).await?;
        let pids = parse_listener_pids(&listing)?;

        if pids.is_empty() {
            debug!("port {} is free", port);
            return Ok(pids);
        }

        for &pid in &pids {
            if self.inspector.kill(pid).await? {
                info!("killed process {} holding port {}", pid, port);
            } else {
                warn!("process {} on port {} could not be killed", pid, port);
            }
        }

        Ok(pids)
    }
}
