// Child process spawning.

use std::{fmt, path::PathBuf, process::Stdio};
use tokio::process::{Child, Command};
use tracing::debug;
use crate::{config::LaunchSettings, errors::{Error, Result}};

/// One child to launch: program, arguments and a name for the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessSpec {
    /// `<server_binary> <subcommand> :<port>`
    pub fn server(settings: &LaunchSettings, port: u16) -> Self {
        Self {
            label: format!("server :{}", port),
            program: settings.server_binary.clone(),
            args: vec![settings.server_subcommand.clone(), format!(":{}", port)],
        }
    }

    /// The benchmark script takes no arguments and finds the cluster itself.
    pub fn benchmark(settings: &LaunchSettings) -> Self {
        Self {
            label: "benchmark".to_string(),
            program: settings.benchmark_script.clone(),
            args: vec![],
        }
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[allow(async_fn_in_trait)]
pub trait ProcessSpawner {
    type Handle;

    /// Start the child without waiting on it.
    fn spawn(&self, spec: &ProcessSpec) -> Result<Self::Handle>;

    /// Force-kill the child and reap it. A child that already exited is fine.
    async fn terminate(&self, handle: &mut Self::Handle) -> std::io::Result<()>;
}

/// Spawns real processes that share the harness's stdout and stderr, so
/// their logs show up in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    type Handle = Child;

    fn spawn(&self, spec: &ProcessSpec) -> Result<Child> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::Spawn { program: spec.program.display().to_string(), source })?;

        debug!("spawned `{}` as pid {:?}", spec, child.id());
        Ok(child)
    }

    async fn terminate(&self, handle: &mut Child) -> std::io::Result<()> {
        if let Some(status) = handle.try_wait()? {
            debug!("child already exited with {}", status);
            return Ok(());
        }

        handle.start_kill()?;
        let status = handle.wait().await?;
        debug!("child stopped with {}", status);
        Ok(())
    }
}
