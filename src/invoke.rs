//! External process invocation.
//!
//! The core never spawns processes directly. It builds an [`Invocation`]
//! and hands it to an [`Invoker`], so tests can substitute a mock and
//! assert on the exact command without touching the host.
//!
//! Execution is synchronous: one reconciliation issues at most one blocking
//! subprocess and waits for it. No timeout is imposed here; callers needing
//! bounded latency wrap the call themselves.

use std::process::Command;

use serde::Serialize;

use crate::error::{KeyError, KeyResult};

/// A fully resolved external command. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub containerized: bool,
    pub container_image: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            containerized: false,
            container_image: None,
        }
    }

    /// Flat command line, program first. Used for logging and for literal
    /// comparison in tests.
    pub fn command_line(&self) -> Vec<String> {
        let mut line = Vec::with_capacity(1 + self.args.len());
        line.push(self.program.clone());
        line.extend(self.args.iter().cloned());
        line
    }
}

/// Captured outcome of one subprocess run. A non-zero `rc` is data here,
/// not an error; the caller decides whether it is fatal.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Synchronous command execution seam.
pub trait Invoker {
    /// Run the invocation to completion, capturing stdout and stderr.
    ///
    /// Returns `Err` only when the process could not be run at all
    /// (missing executable, spawn failure); exit status is reported
    /// through [`CommandOutput::rc`].
    fn run(&self, invocation: &Invocation) -> KeyResult<CommandOutput>;
}

/// Runs invocations directly on the host.
#[derive(Debug, Default)]
pub struct HostInvoker;

impl Invoker for HostInvoker {
    fn run(&self, invocation: &Invocation) -> KeyResult<CommandOutput> {
        tracing::debug!(cmd = ?invocation.command_line(), "running external command");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    KeyError::ExternalTool(format!(
                        "{} not found. Install it on the host.",
                        invocation.program
                    ))
                } else {
                    KeyError::ExternalTool(format!(
                        "failed to run {}: {}",
                        invocation.program, e
                    ))
                }
            })?;

        Ok(CommandOutput {
            rc: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
