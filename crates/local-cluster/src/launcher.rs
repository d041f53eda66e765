// The launcher.
// Writes the cluster config, brings up one server per port plus the
// benchmark, then holds until told to shut down.

use std::path::PathBuf;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};
use crate::{
    config::{generate_config, LaunchSettings},
    errors::{Error, Result},
    process::{ProcessSpawner, ProcessSpec, TokioSpawner},
    reaper::{Lsof, PortInspector, PortReaper},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Why the launcher stopped holding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupted,
    // Nobody is left to deliver an interrupt.
    SignalClosed,
    HoldElapsed,
}

/// A child started by this run.
pub struct TrackedProcess<H> {
    pub spec: ProcessSpec,
    // None for the benchmark.
    pub port: Option<u16>,
    pub handle: H,
}

pub struct Launcher<I, S: ProcessSpawner> {
    settings: LaunchSettings,
    reaper: PortReaper<I>,
    spawner: S,
    ports: Vec<u16>,
    processes: Vec<TrackedProcess<S::Handle>>,
    status: Status,
}

impl Launcher<Lsof, TokioSpawner> {
    /// Launcher backed by `lsof`, `kill` and real child processes.
    pub fn with_system(settings: LaunchSettings) -> Self {
        let inspector = Lsof::new(settings.inspector.clone());
        Self::new(settings, inspector, TokioSpawner)
    }
}

impl<I: PortInspector, S: ProcessSpawner> Launcher<I, S> {
    pub fn new(settings: LaunchSettings, inspector: I, spawner: S) -> Self {
        Self {
            settings,
            reaper: PortReaper::new(inspector),
            spawner,
            ports: vec![],
            processes: vec![],
            status: Status::Starting,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn processes(&self) -> &[TrackedProcess<S::Handle>] {
        &self.processes
    }

    /// Full run: start, hold until `shutdown` fires (or the hold timer
    /// runs out), then clean up.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<()>) -> Result<ShutdownReason> {
        if let Err(e) = self.start().await {
            // Whatever did come up must not outlive us.
            if let Err(stop_err) = self.stop_children().await {
                warn!("cleanup after failed start: {}", stop_err);
            }
            return Err(e);
        }

        let reason = self.hold(&mut shutdown).await;
        self.shutdown().await?;
        Ok(reason)
    }

    /// Write the config, then reap and spawn each server in port order and
    /// finally the benchmark. Returns the config path.
    pub async fn start(&mut self) -> Result<PathBuf> {
        self.ports = self.settings.ports()?;
        let config_path = generate_config(&self.settings)?;

        for port in self.ports.clone() {
            self.reaper.free_port(port).await?;

            let spec = ProcessSpec::server(&self.settings, port);
            let handle = self.spawner.spawn(&spec)?;
            info!("Started {}", spec);
            self.processes.push(TrackedProcess { spec, port: Some(port), handle });
        }

        let spec = ProcessSpec::benchmark(&self.settings);
        let handle = self.spawner.spawn(&spec)?;
        info!("Started {}", spec);
        self.processes.push(TrackedProcess { spec, port: None, handle });

        self.status = Status::Running;
        Ok(config_path)
    }

    pub async fn hold(&self, shutdown: &mut watch::Receiver<()>) -> ShutdownReason {
        let reason = tokio::select! {
            changed = shutdown.changed() => match changed {
                Ok(()) => ShutdownReason::Interrupted,
                Err(_) => ShutdownReason::SignalClosed,
            },
            _ = tokio::time::sleep(self.settings.hold) => ShutdownReason::HoldElapsed,
        };

        info!("Stop holding: {:?}", reason);
        reason
    }

    /// Kill every tracked child, then sweep the ports again. The sweep also
    /// kills unrelated processes that grabbed one of our ports. Stops at the
    /// first failure.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.status = Status::ShuttingDown;
        self.stop_children().await?;

        for &port in &self.ports {
            self.reaper.free_port(port).await?;
        }

        self.status = Status::Stopped;
        Ok(())
    }

    /// Kill and reap every tracked child in spawn order. A child is dropped
    /// from tracking once it is stopped.
    async fn stop_children(&mut self) -> Result<()> {
        while !self.processes.is_empty() {
            let process = &mut self.processes[0];
            self.spawner
                .terminate(&mut process.handle)
                .await
                .map_err(|source| Error::Terminate { label: process.spec.label.clone(), source })?;
            info!("Stopped {}", process.spec.label);
            self.processes.remove(0);
        }
        Ok(())
    }
}

/// SIGINT and SIGTERM streams, installed up front so a failure to
/// register them stops the harness before anything is spawned.
pub struct ShutdownSignals {
    sigint: Signal,
    sigterm: Signal,
}

impl ShutdownSignals {
    pub fn install() -> Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt()).map_err(Error::Signal)?,
            sigterm: signal(SignalKind::terminate()).map_err(Error::Signal)?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }

    /// Fire `shutdown` on the first signal, then return on the second one
    /// so the caller can give up on a cleanup that hangs.
    pub async fn forward(mut self, shutdown: watch::Sender<()>) {
        let name = self.recv().await;
        info!("{} detected.", name);
        // The launcher may already be gone; nothing left to stop then.
        let _ = shutdown.send(());

        let name = self.recv().await;
        warn!("{} detected again, abandoning cleanup.", name);
    }
}
