// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `rebaseline-cl` runs.
///
/// Every abort condition that a user is expected to resolve (unstaged baselines, no issue for the
/// current branch, missing try jobs, freshly triggered try jobs, incomplete results) results in
/// exit code 1. Errors in the tool's own setup have distinct codes.
pub enum RebaselineExitCode {}

impl RebaselineExitCode {
    /// No errors occurred, and baselines were handed off (or a dry run completed).
    pub const OK: i32 = 0;

    /// The run was aborted, and must be re-run once the reported condition is resolved.
    pub const ABORTED: i32 = 1;

    /// Handing off the work order to the rebaseline executor failed.
    pub const EXECUTOR_FAILED: i32 = 105;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a run: bad configuration, or a required tool like
    /// `git` could not be executed.
    pub const SETUP_ERROR: i32 = 96;
}
