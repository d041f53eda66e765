//! In-memory stand-ins for the OS so the reaper and launcher can be tested
//! without touching real processes.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use crate::errors::{Error, Result};
use crate::process::{ProcessSpawner, ProcessSpec};
use crate::reaper::PortInspector;

pub const LSOF_HEADER: &str = "COMMAND     PID USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Listeners(u16),
    Kill(u32),
    Spawn(String),
    Terminate(String),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn kills(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Kill(pid) => Some(pid),
                _ => None,
            })
            .collect()
    }
}

/// lsof-style listing with one listening row per pid.
pub fn listing(command: &str, pids: &[u32]) -> String {
    let mut out = String::from(LSOF_HEADER);
    for pid in pids {
        out.push_str(&format!(
            "\n{} {:>7} dev    3u  IPv4 0x1f2e3d4c5b6a7988      0t0  TCP *:http-alt (LISTEN)",
            command, pid
        ));
    }
    out.push('\n');
    out
}

#[derive(Debug, Clone, Default)]
pub struct FakeInspector {
    pub log: EventLog,
    listings: HashMap<u16, String>,
    gone: HashSet<u32>,
    // Number of lookups that succeed before the inspector "disappears".
    working_lookups: Option<usize>,
}

impl FakeInspector {
    pub fn new(log: EventLog) -> Self {
        Self { log, ..Self::default() }
    }

    pub fn with_listing(mut self, port: u16, listing: impl Into<String>) -> Self {
        self.listings.insert(port, listing.into());
        self
    }

    /// `kill` for this pid reports the signal as undelivered.
    pub fn with_gone_pid(mut self, pid: u32) -> Self {
        self.gone.insert(pid);
        self
    }

    pub fn unavailable(self) -> Self {
        self.failing_after(0)
    }

    pub fn failing_after(mut self, lookups: usize) -> Self {
        self.working_lookups = Some(lookups);
        self
    }

    fn lookups(&self) -> usize {
        self.log
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Listeners(_)))
            .count()
    }
}

impl PortInspector for FakeInspector {
    async fn listeners(&self, port: u16) -> Result<String> {
        if self.working_lookups.is_some_and(|n| self.lookups() >= n) {
            return Err(Error::Inspector {
                program: "lsof".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        self.log.push(Event::Listeners(port));
        // lsof prints nothing at all for a free port.
        Ok(self.listings.get(&port).cloned().unwrap_or_default())
    }

    async fn kill(&self, pid: u32) -> Result<bool> {
        self.log.push(Event::Kill(pid));
        Ok(!self.gone.contains(&pid))
    }
}

#[derive(Debug)]
pub struct FakeChild {
    pub command: String,
    pub killed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    pub log: EventLog,
    fail_program: Option<String>,
}

impl FakeSpawner {
    pub fn new(log: EventLog) -> Self {
        Self { log, fail_program: None }
    }

    pub fn failing_on(mut self, program: &str) -> Self {
        self.fail_program = Some(program.to_string());
        self
    }
}

impl ProcessSpawner for FakeSpawner {
    type Handle = FakeChild;

    fn spawn(&self, spec: &ProcessSpec) -> Result<FakeChild> {
        let program = spec.program.display().to_string();
        if self.fail_program.as_deref() == Some(program.as_str()) {
            return Err(Error::Spawn {
                program,
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        let command = spec.to_string();
        self.log.push(Event::Spawn(command.clone()));
        Ok(FakeChild { command, killed: false })
    }

    async fn terminate(&self, handle: &mut FakeChild) -> io::Result<()> {
        handle.killed = true;
        self.log.push(Event::Terminate(handle.command.clone()));
        Ok(())
    }
}
