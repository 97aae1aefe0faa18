//! Spawns the native host binary and talks to it over stdio.
//!
//! This is the infrastructure layer — it touches the OS process table.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use super::{HostConnection, HostError, HostEvent};
use crate::config::HostConfig;

pub struct HostProcess {
    child: Child,
    connection: Arc<HostConnection>,
}

impl HostProcess {
    /// Resolves and launches the host, returning it with its event stream.
    pub fn spawn(config: &HostConfig) -> Result<(Self, mpsc::Receiver<HostEvent>), HostError> {
        let program = resolve_program(config)?;
        let start = std::time::Instant::now();

        let mut child = Command::new(&program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(HostError::Spawn)?;

        let stdin = child.stdin.take().ok_or(HostError::Closed)?;
        let stdout = child.stdout.take().ok_or(HostError::Closed)?;
        let (connection, events) = HostConnection::new(stdout, stdin);

        log::info!(
            "[HOST] Spawned {} (pid {:?}) in {}ms",
            program.display(),
            child.id(),
            start.elapsed().as_millis()
        );

        Ok((
            Self {
                child,
                connection: Arc::new(connection),
            },
            events,
        ))
    }

    pub fn connection(&self) -> Arc<HostConnection> {
        Arc::clone(&self.connection)
    }

    /// Stops the host if it is still running.
    pub async fn shutdown(mut self) -> Result<(), HostError> {
        if self.child.try_wait()?.is_none() {
            self.child.kill().await?;
        }
        let status = self.child.wait().await?;
        log::info!("[HOST] Exited with {}", status);
        Ok(())
    }
}

fn resolve_program(config: &HostConfig) -> Result<PathBuf, HostError> {
    if config.command.components().count() > 1 {
        return if config.command.exists() {
            Ok(config.command.clone())
        } else {
            Err(HostError::NotFound(config.command.display().to_string()))
        };
    }
    which::which(&config.command)
        .map_err(|e| HostError::NotFound(format!("{}: {}", config.command.display(), e)))
}
