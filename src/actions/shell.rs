//! Deadline-bounded subprocess execution.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;

use crate::error::ActionError;

#[derive(Debug, Clone, Default)]
pub struct ShellSpec {
    pub command: Vec<String>,
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub timeout_seconds: Option<f64>,
}

/// Collected outcome of a child that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[async_trait]
pub trait ShellRunner: Send + Sync {
    async fn run(&self, spec: &ShellSpec) -> Result<CommandOutput, ActionError>;
}

/// Runner that spawns real child processes.
pub struct SystemRunner;

#[async_trait]
impl ShellRunner for SystemRunner {
    async fn run(&self, spec: &ShellSpec) -> Result<CommandOutput, ActionError> {
        let Some((program, args)) = spec.command.split_first() else {
            return Err(ActionError::EmptyCommand);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &spec.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        let child = cmd
            .spawn()
            .map_err(|e| ActionError::Spawn(e.to_string()))?;
        let pid = child.id();
        log::debug!("spawned pid={pid:?} command={:?}", spec.command);

        // wait_with_output drains both pipes while waiting, so a child
        // producing more than a pipe buffer cannot deadlock the waiter.
        let waited = match spec.timeout_seconds {
            Some(secs) if secs > 0.0 => {
                match time::timeout(Duration::from_secs_f64(secs), child.wait_with_output()).await {
                    Ok(waited) => waited,
                    Err(_) => {
                        // Dropping the wait future drops the child handle;
                        // kill_on_drop delivers SIGKILL so the child does
                        // not outlive the request.
                        log::warn!("pid={pid:?} exceeded {secs}s deadline, terminating");
                        return Err(ActionError::Timeout);
                    }
                }
            }
            _ => child.wait_with_output().await,
        };

        let output = waited.map_err(|e| ActionError::Io(e.to_string()))?;
        let exit_code = output.status.code().unwrap_or(-1);
        log::debug!("pid={pid:?} exited with {exit_code}");
        Ok(CommandOutput {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
