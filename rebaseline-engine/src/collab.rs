// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the systems a rebaseline run talks to.
//!
//! Each collaborator is a trait so that the orchestrator can be driven by in-memory fakes in
//! tests. Production implementations live in [`git`](crate::git),
//! [`results_archive`](crate::results_archive), [`config`](crate::config) and
//! [`executor`](crate::executor).

use crate::{
    build::{Build, Platform},
    errors::{CollaboratorError, ExecutorError},
    report::TestResultReport,
};
use rebaseline_metadata::WorkOrderSummary;
use std::collections::BTreeSet;

/// Version control state for the change being rebaselined.
pub trait ChangeSource {
    /// Returns the code review issue number for the current branch, or `None` if there isn't one.
    fn current_change_id(&self) -> Result<Option<u64>, CollaboratorError>;

    /// Returns the paths of files changed by the current change, relative to the repository root
    /// and `/`-separated.
    ///
    /// `diff_filter` selects the kinds of change to report, in `git diff --diff-filter` syntax
    /// (for example `"AM"` for added and modified files).
    fn changed_file_paths(&self, diff_filter: &str) -> Result<Vec<String>, CollaboratorError>;

    /// Returns the paths of files with unstaged changes (including untracked files), relative to
    /// the repository root.
    fn unstaged_files(&self) -> Result<Vec<String>, CollaboratorError>;
}

/// The try server that runs builds for the current change.
pub trait BuildSource {
    /// Returns the latest build for each of the given builders that has one.
    ///
    /// Builders without any build are absent from the result.
    fn latest_builds(&self, builders: &BTreeSet<String>) -> Result<Vec<Build>, CollaboratorError>;

    /// Schedules try jobs on the given builders.
    fn trigger_builds(&self, builders: &BTreeSet<String>) -> Result<(), CollaboratorError>;
}

/// The archive that finished try jobs upload their results to.
///
/// Fetch failures are never errors: they are reported as `None`.
pub trait ResultsSource {
    /// Returns the base URL of the results for a finished build.
    fn results_url(&self, builder_name: &str, build_number: u64) -> String;

    /// Fetches the test result report for a build.
    fn fetch_results(&self, build: &Build) -> Option<TestResultReport>;

    /// Fetches the raw retry summary for a build.
    fn fetch_retry_summary(&self, build: &Build) -> Option<String>;
}

/// The set of builders a project runs try jobs on, and the platform each one produces results
/// for.
pub trait PlatformRegistry {
    /// Returns the names of all try builders.
    fn all_supported_builders(&self) -> BTreeSet<String>;

    /// Returns the platform the given builder produces results for.
    fn platform_for_builder(&self, builder_name: &str) -> Platform;

    /// Returns the platforms of all try builders.
    fn all_platforms(&self) -> BTreeSet<Platform> {
        self.all_supported_builders()
            .iter()
            .map(|builder| self.platform_for_builder(builder))
            .collect()
    }
}

/// Downloads the baselines described by a work order and writes them to disk.
pub trait RebaselineExecutor {
    /// Carries out the work order.
    fn rebaseline(&self, work_order: &WorkOrderSummary) -> Result<(), ExecutorError>;
}
