// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use rebaseline_engine::errors::{
    CollaboratorError, ConfigParseError, ExecutorError, RunError,
};
use rebaseline_metadata::RebaselineExitCode;
use std::{error::Error, string::FromUtf8Error};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholder messages: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An error that rebaseline-cl knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("git rev-parse exec failed")]
    RepoRootExecFailed {
        command: String,
        #[source]
        err: std::io::Error,
    },
    #[error("git rev-parse failed")]
    RepoRootFailed { command: String },
    #[error("repository root is not valid UTF-8")]
    RepoRootInvalidUtf8 {
        #[source]
        err: FromUtf8Error,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("collaborator error")]
    CollaboratorError {
        #[source]
        err: CollaboratorError,
    },
    #[error("executor error")]
    ExecutorError {
        #[source]
        err: ExecutorError,
    },
}

impl ExpectedError {
    pub(crate) fn repo_root_exec_failed(command: &[&str], err: std::io::Error) -> Self {
        Self::RepoRootExecFailed {
            command: shell_words::join(command),
            err,
        }
    }

    pub(crate) fn repo_root_failed(command: &[&str]) -> Self {
        Self::RepoRootFailed {
            command: shell_words::join(command),
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::RepoRootExecFailed { .. }
            | Self::RepoRootFailed { .. }
            | Self::RepoRootInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::CollaboratorError { .. } => RebaselineExitCode::SETUP_ERROR,
            Self::ExecutorError {
                err: ExecutorError::WriteOutput(_),
            } => RebaselineExitCode::WRITE_OUTPUT_ERROR,
            Self::ExecutorError { .. } => RebaselineExitCode::EXECUTOR_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::RepoRootExecFailed { command, err } => {
                error!("failed to execute `{}`", command.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RepoRootFailed { command } => {
                error!(
                    "command `{}` failed (rebaseline-cl must be run inside a git checkout)",
                    command.style(styles.bold)
                );
                None
            }
            Self::RepoRootInvalidUtf8 { err } => {
                error!("repository root is not valid UTF-8");
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse rebaseline config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::CollaboratorError { err } => {
                // The first line already names the command that failed.
                error!("{err}");
                err.source()
            }
            Self::ExecutorError { err } => {
                error!("{err}");
                err.source()
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<RunError> for ExpectedError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Collaborator(err) => Self::CollaboratorError { err },
            RunError::Executor(err) => Self::ExecutorError { err },
        }
    }
}
