//! External viewer processes.
//!
//! Viewers are spawned detached from the terminal and never waited on.
//! Handles of finished ones are reaped whenever a new viewer starts and when
//! the launcher is dropped.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no viewer command configured")]
    NoCommand,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Keeps the handles of viewers it started.
#[derive(Debug, Default)]
pub struct ViewerLauncher {
    children: Vec<Child>,
}

impl ViewerLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `command` with `paths` appended.
    pub fn launch(&mut self, command: &[String], paths: &[PathBuf]) -> Result<(), LaunchError> {
        self.reap();
        let (program, args) = command.split_first().ok_or(LaunchError::NoCommand)?;

        let child = Command::new(program)
            .args(args)
            .args(paths)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                program: program.clone(),
                source: e,
            })?;
        debug!(program = %program, pid = child.id(), files = paths.len(), "viewer started");
        self.children.push(child);
        Ok(())
    }

    /// Drops handles of viewers that have exited, returning how many.
    pub fn reap(&mut self) -> usize {
        let before = self.children.len();
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
        before - self.children.len()
    }

    /// Viewers started and not yet seen exiting.
    pub fn running(&self) -> usize {
        self.children.len()
    }
}

impl Drop for ViewerLauncher {
    fn drop(&mut self) {
        self.reap();
    }
}
