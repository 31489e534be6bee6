//! Shell source: runs a command on every poll and decodes its stdout.

use std::process::{Command, Output};

use crate::core::errors::{DashpadError, Result};
use crate::protocol::{DashboardState, decode_payload};
use crate::source::Source;

#[derive(Debug, Clone)]
pub struct ShellSource {
    command: String,
}

impl ShellSource {
    #[must_use]
    pub const fn new(command: String) -> Self {
        Self { command }
    }

    fn run(&self) -> Result<Output> {
        shell_command(&self.command)
            .output()
            .map_err(|e| DashpadError::CommandFailed {
                command: self.command.clone(),
                status: format!("failed to start: {e}"),
                stderr: String::new(),
            })
    }
}

impl Source for ShellSource {
    fn poll(&mut self) -> Result<DashboardState> {
        let output = self.run()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // The command's own diagnostics are the most useful thing to show.
            if !stderr.trim().is_empty() {
                eprint!("{stderr}");
            }
            return Err(DashpadError::CommandFailed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let origin = self.describe();
        let stdout = String::from_utf8(output.stdout).map_err(|e| DashpadError::Payload {
            origin: origin.clone(),
            details: format!("stdout is not UTF-8: {e}"),
        })?;
        decode_payload(&stdout, &origin)
    }

    fn describe(&self) -> String {
        format!("shell:{}", self.command)
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
