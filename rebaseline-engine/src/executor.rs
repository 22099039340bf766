// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handing a finished work order to the tool that downloads baselines.

use crate::{collab::RebaselineExecutor, errors::ExecutorError};
use camino::Utf8PathBuf;
use rebaseline_metadata::WorkOrderSummary;
use std::io::Write;
use tracing::{debug, info};

/// Pipes the work order, as JSON, to the standard input of an external command.
///
/// The command's standard output and standard error are inherited.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    cwd: Utf8PathBuf,
}

impl CommandExecutor {
    /// Creates a new executor running `program` with `args`, in the directory `cwd`.
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }

    /// Creates a new executor from a command line, or returns `None` if it is empty.
    pub fn from_command_line(command: &[String], cwd: impl Into<Utf8PathBuf>) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), cwd))
    }

    fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }
}

impl RebaselineExecutor for CommandExecutor {
    fn rebaseline(&self, work_order: &WorkOrderSummary) -> Result<(), ExecutorError> {
        let json = work_order_json(work_order)?;
        let expression = duct::cmd(self.program.as_str(), &self.args)
            .dir(self.cwd.as_std_path())
            .stdin_bytes(json)
            .unchecked();
        info!(
            "handing {} entries to `{}`",
            work_order.entries.len(),
            self.command_line()
        );
        debug!("executing command: {:?}", expression);
        let output = expression.run().map_err(|err| ExecutorError::Exec {
            command: self.command_line(),
            err,
        })?;
        if !output.status.success() {
            return Err(ExecutorError::CommandFailed {
                command: self.command_line(),
                exit_code: output.status.code(),
            });
        }
        Ok(())
    }
}

/// Prints the work order, as JSON, to standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintExecutor;

impl RebaselineExecutor for PrintExecutor {
    fn rebaseline(&self, work_order: &WorkOrderSummary) -> Result<(), ExecutorError> {
        let json = work_order_json(work_order)?;
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&json)
            .and_then(|()| stdout.flush())
            .map_err(ExecutorError::WriteOutput)
    }
}

/// Serializes a work order to pretty-printed JSON, followed by a newline.
pub fn work_order_json(work_order: &WorkOrderSummary) -> Result<Vec<u8>, ExecutorError> {
    let mut json = serde_json::to_vec_pretty(work_order).map_err(ExecutorError::Serialize)?;
    json.push(b'\n');
    Ok(json)
}
