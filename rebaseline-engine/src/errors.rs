// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by rebaseline-engine.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse rebaseline config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building or deserializing the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// No try builders were defined.
    #[error("no builders defined (add at least one [[builders]] table)")]
    NoBuilders,

    /// A builder was defined more than once.
    #[error("builder `{0}` is defined more than once")]
    DuplicateBuilder(String),

    /// A builder was defined with an empty name or platform.
    #[error("builder at index {index} has an empty {field}")]
    EmptyBuilderField {
        /// The index of the builder in the `builders` array.
        index: usize,

        /// The field that was empty.
        field: &'static str,
    },
}

/// An error that occurred while running a collaborator command such as `git` or `git cl`.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The command couldn't be executed.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The command exited with a non-zero code.
    #[error("`{command}` exited{}:\n{stderr}", DisplayExitCode(.exit_code))]
    CommandFailed {
        /// The command line.
        command: String,

        /// The exit code, if the process wasn't terminated by a signal.
        exit_code: Option<i32>,

        /// Standard error of the process.
        stderr: String,
    },

    /// The command's output couldn't be parsed.
    #[error("failed to parse output of `{command}`")]
    OutputParse {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: serde_json::Error,
    },

    /// A temporary file used to collect command output couldn't be created or read.
    #[error("error accessing temporary file for `{command}`")]
    TempFile {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

impl CollaboratorError {
    pub(crate) fn exec(
        command: impl IntoIterator<Item = impl AsRef<str>>,
        err: std::io::Error,
    ) -> Self {
        Self::Exec {
            command: shell_words::join(command),
            err,
        }
    }

    pub(crate) fn command_failed(
        command: impl IntoIterator<Item = impl AsRef<str>>,
        exit_code: Option<i32>,
        stderr: &[u8],
    ) -> Self {
        Self::CommandFailed {
            command: shell_words::join(command),
            exit_code,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    pub(crate) fn output_parse(
        command: impl IntoIterator<Item = impl AsRef<str>>,
        err: serde_json::Error,
    ) -> Self {
        Self::OutputParse {
            command: shell_words::join(command),
            err,
        }
    }

    pub(crate) fn temp_file(
        command: impl IntoIterator<Item = impl AsRef<str>>,
        err: std::io::Error,
    ) -> Self {
        Self::TempFile {
            command: shell_words::join(command),
            err,
        }
    }
}

/// An error that occurred while handing a work order to the rebaseline executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The work order couldn't be serialized.
    #[error("failed to serialize work order")]
    Serialize(#[source] serde_json::Error),

    /// The work order couldn't be written to standard output.
    #[error("failed to write work order to stdout")]
    WriteOutput(#[source] std::io::Error),

    /// The executor command couldn't be executed.
    #[error("failed to execute rebaseline executor `{command}`")]
    Exec {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The executor command exited with a non-zero code.
    #[error("rebaseline executor `{command}` exited{}", DisplayExitCode(.exit_code))]
    CommandFailed {
        /// The command line.
        command: String,

        /// The exit code, if the process wasn't terminated by a signal.
        exit_code: Option<i32>,
    },
}

/// An error that stopped a rebaseline run before it could reach a decision.
///
/// Abort conditions that a user is expected to resolve (unstaged baselines, missing try jobs and so
/// on) are not errors: see [`RunTermination`](crate::orchestrator::RunTermination).
#[derive(Debug, Error)]
pub enum RunError {
    /// Querying version control or the try server failed.
    #[error("error querying change or try job state")]
    Collaborator(#[from] CollaboratorError),

    /// Handing off the work order failed.
    #[error("error running rebaseline executor")]
    Executor(#[from] ExecutorError),
}

/// An error that occurred while fetching a file from a results archive.
///
/// These are never fatal: a build whose results can't be fetched is left out of the work order.
#[derive(Debug, Error)]
pub enum ResultsFetchError {
    /// The HTTP request failed.
    #[error("request to `{url}` failed")]
    Request {
        /// The URL requested.
        url: String,

        /// The underlying error.
        #[source]
        err: Box<ureq::Error>,
    },

    /// The response body was empty.
    #[error("response from `{url}` was empty")]
    EmptyBody {
        /// The URL requested.
        url: String,
    },
}

struct DisplayExitCode<'a>(&'a Option<i32>);

impl fmt::Display for DisplayExitCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            Some(code) => write!(f, " with code {code}"),
            None => write!(f, " due to a signal"),
        }
    }
}
