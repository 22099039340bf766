// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequencing a rebaseline run.
//!
//! A run is a fixed series of steps. Each step either continues with a value, or terminates the
//! run with a [`RunTermination`] that tells the user what to do next. Collaborator failures are
//! reported separately, as [`RunError`]s.

use crate::{
    build::Build,
    collab::{BuildSource, ChangeSource, PlatformRegistry, RebaselineExecutor, ResultsSource},
    errors::RunError,
    fetch::{FetchedResults, fetch_results},
    fill::fill_in_missing_results,
    regressions::fetch_tests_to_rebaseline,
    work_order::{TestBaselineSet, WorkOrderWarning},
};
use rebaseline_metadata::{RebaselineExitCode, WorkOrderSummary};
use std::{collections::BTreeSet, fmt, ops::ControlFlow};
use tracing::{debug, error, info};

/// The suffixes of baseline files.
pub const BASELINE_SUFFIXES: &[&str] = &["-expected.txt", "-expected.png", "-expected.wav"];

/// The diff filter used to find tests changed by the current change: added or modified files.
const CHANGED_TESTS_DIFF_FILTER: &str = "AM";

/// User-selected options for a rebaseline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebaselineOptions {
    /// Tests to rebaseline. If empty, regressions are discovered from try job results.
    pub tests: Vec<String>,

    /// Build the work order but don't hand it off.
    pub dry_run: bool,

    /// Only rebaseline tests that the current change adds or modifies.
    pub only_changed_tests: bool,

    /// Trigger try jobs on builders that have no results.
    pub trigger_jobs: bool,

    /// Borrow results from similar platforms for platforms that have none.
    pub fill_missing: bool,

    /// Ask the executor to skip baseline optimization.
    pub no_optimize: bool,
}

/// The systems a rebaseline run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Version control state.
    pub changes: &'a dyn ChangeSource,

    /// The try server.
    pub builds: &'a dyn BuildSource,

    /// The results archive.
    pub results: &'a dyn ResultsSource,

    /// Builders and their platforms.
    pub registry: &'a dyn PlatformRegistry,

    /// The downstream baseline downloader.
    pub executor: &'a dyn RebaselineExecutor,
}

impl fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("builders", &self.registry.all_supported_builders())
            .finish_non_exhaustive()
    }
}

/// Why a run stopped before producing a work order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunTermination {
    /// There are baseline files with unstaged changes, which a run could overwrite.
    UnstagedBaselines(Vec<String>),

    /// The current branch isn't associated with a code review issue.
    NoChangeId,

    /// Try jobs were started on builders without results; the user should re-run later.
    JobsTriggered(BTreeSet<String>),

    /// Some builders have no results, and filling in was not requested.
    BuildersWithNoResults(BTreeSet<String>),

    /// Results couldn't be fetched for some builds, and filling in was not requested.
    IncompleteResults(Vec<Build>),
}

impl RunTermination {
    /// Returns the process exit code for this termination.
    pub fn exit_code(&self) -> i32 {
        RebaselineExitCode::ABORTED
    }
}

/// The result of a run that didn't fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// A work order was built.
    Completed {
        /// The work order.
        work_order: WorkOrderSummary,

        /// Whether the work order was handed to the executor (false for dry runs).
        handed_off: bool,
    },

    /// The run stopped early.
    Terminated(RunTermination),
}

impl RunOutcome {
    /// Returns the process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => RebaselineExitCode::OK,
            Self::Terminated(termination) => termination.exit_code(),
        }
    }
}

/// Unwraps a `ControlFlow`, returning early from the enclosing step runner on `Break`.
macro_rules! step {
    ($e:expr) => {
        match $e {
            ControlFlow::Continue(value) => value,
            ControlFlow::Break(termination) => return Ok(ControlFlow::Break(termination)),
        }
    };
}

type StepResult<T> = Result<ControlFlow<RunTermination, T>, RunError>;

/// Runs the steps of a rebaseline against a set of collaborators.
#[derive(Clone, Debug)]
pub struct Rebaseliner<'a> {
    collab: Collaborators<'a>,
    layout_tests_base_dir: String,
}

impl<'a> Rebaseliner<'a> {
    /// Creates a new `Rebaseliner`.
    ///
    /// `layout_tests_base_dir` is the directory tests live in relative to the repository root,
    /// ending in `/`. It is used to turn changed file paths into test names.
    pub fn new(collab: Collaborators<'a>, layout_tests_base_dir: impl Into<String>) -> Self {
        Self {
            collab,
            layout_tests_base_dir: layout_tests_base_dir.into(),
        }
    }

    /// Runs a rebaseline.
    pub fn run(&self, options: &RebaselineOptions) -> Result<RunOutcome, RunError> {
        match self.run_steps(options)? {
            ControlFlow::Continue(outcome) => Ok(outcome),
            ControlFlow::Break(termination) => Ok(RunOutcome::Terminated(termination)),
        }
    }

    fn run_steps(&self, options: &RebaselineOptions) -> StepResult<RunOutcome> {
        step!(self.check_unstaged_baselines()?);
        let change_id = step!(self.check_change_id()?);
        debug!("issue number for current branch: {change_id}");

        let builds = self.discover_builds()?;
        step!(self.check_builders_with_no_results(&builds, options)?);

        debug!("getting results for issue {change_id}");
        let fetched = step!(self.fetch_results(&builds, options));

        let mut test_baseline_set = TestBaselineSet::new(self.collab.registry);
        for build in fetched.unavailable() {
            test_baseline_set.record_warning(WorkOrderWarning::ResultsUnavailable(build.clone()));
        }
        if options.tests.is_empty() {
            self.add_regressions(&mut test_baseline_set, &fetched, options)?;
        } else {
            add_explicit_tests(&mut test_baseline_set, &fetched, &options.tests);
        }

        if options.fill_missing {
            fill_in_missing_results(&mut test_baseline_set, &self.collab.registry.all_platforms());
        }

        debug!("rebaselining: {test_baseline_set}");
        let work_order = test_baseline_set.to_summary(options.no_optimize);
        let handed_off = self.hand_off(&work_order, options)?;
        Ok(ControlFlow::Continue(RunOutcome::Completed {
            work_order,
            handed_off,
        }))
    }

    // ---
    // Steps
    // ---

    fn check_unstaged_baselines(&self) -> StepResult<()> {
        let unstaged: Vec<String> = self
            .collab
            .changes
            .unstaged_files()?
            .into_iter()
            .filter(|path| is_baseline_file(path))
            .collect();
        if unstaged.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }

        error!("aborting: there are unstaged baselines:");
        for path in &unstaged {
            error!(target: "rebaseline_cl::no_heading", "  {path}");
        }
        Ok(ControlFlow::Break(RunTermination::UnstagedBaselines(unstaged)))
    }

    fn check_change_id(&self) -> StepResult<u64> {
        match self.collab.changes.current_change_id()? {
            Some(change_id) => Ok(ControlFlow::Continue(change_id)),
            None => {
                error!("no issue number for current branch");
                Ok(ControlFlow::Break(RunTermination::NoChangeId))
            }
        }
    }

    fn discover_builds(&self) -> Result<Vec<Build>, RunError> {
        let builders = self.collab.registry.all_supported_builders();
        let mut builds = self.collab.builds.latest_builds(&builders)?;
        builds.retain(|build| builders.contains(build.builder_name()));
        builds.sort();
        builds.dedup();

        let pending: BTreeSet<&str> = builds
            .iter()
            .filter(|build| build.is_pending())
            .map(Build::builder_name)
            .collect();
        if !pending.is_empty() {
            info!("there are existing pending builds for:");
            for builder in pending {
                info!(target: "rebaseline_cl::no_heading", "  {builder}");
            }
        }
        Ok(builds)
    }

    fn check_builders_with_no_results(
        &self,
        builds: &[Build],
        options: &RebaselineOptions,
    ) -> StepResult<()> {
        let no_results = builders_with_no_results(
            &self.collab.registry.all_supported_builders(),
            builds,
        );
        if no_results.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }

        if options.trigger_jobs {
            info!("triggering try jobs for:");
            for builder in &no_results {
                info!(target: "rebaseline_cl::no_heading", "  {builder}");
            }
            self.collab.builds.trigger_builds(&no_results)?;
            info!("please re-run rebaseline-cl once all pending try jobs have finished");
            return Ok(ControlFlow::Break(RunTermination::JobsTriggered(no_results)));
        }

        if !options.fill_missing {
            error!("the following builders have no results:");
            for builder in &no_results {
                error!(target: "rebaseline_cl::no_heading", "  {builder}");
            }
            return Ok(ControlFlow::Break(RunTermination::BuildersWithNoResults(
                no_results,
            )));
        }
        Ok(ControlFlow::Continue(()))
    }

    fn fetch_results(
        &self,
        builds: &[Build],
        options: &RebaselineOptions,
    ) -> ControlFlow<RunTermination, FetchedResults> {
        let fetched = fetch_results(self.collab.results, builds);
        if !options.fill_missing && !fetched.unavailable().is_empty() {
            error!(
                "results are unavailable for {} of {} builds (use --fill-missing to continue anyway)",
                fetched.unavailable().len(),
                builds.len(),
            );
            return ControlFlow::Break(RunTermination::IncompleteResults(
                fetched.unavailable().to_vec(),
            ));
        }
        ControlFlow::Continue(fetched)
    }

    fn add_regressions(
        &self,
        test_baseline_set: &mut TestBaselineSet<'_>,
        fetched: &FetchedResults,
        options: &RebaselineOptions,
    ) -> Result<(), RunError> {
        let changed_tests = if options.only_changed_tests {
            Some(self.changed_tests()?)
        } else {
            None
        };

        for (build, report) in fetched.iter() {
            let regressions = fetch_tests_to_rebaseline(self.collab.results, build, report);
            if !regressions.filtered_by_retry_summary {
                test_baseline_set
                    .record_warning(WorkOrderWarning::RetrySummaryUnavailable(build.clone()));
            }
            for test in regressions.tests {
                if changed_tests
                    .as_ref()
                    .is_some_and(|changed| !changed.contains(&test))
                {
                    continue;
                }
                test_baseline_set.add(test, build.clone(), None);
            }
        }
        Ok(())
    }

    /// Returns the tests added or modified by the current change.
    fn changed_tests(&self) -> Result<BTreeSet<String>, RunError> {
        // Paths from git are always relative to the repository root and `/`-separated.
        let files = self
            .collab
            .changes
            .changed_file_paths(CHANGED_TESTS_DIFF_FILTER)?;
        Ok(files
            .iter()
            .filter_map(|file| file.strip_prefix(&self.layout_tests_base_dir))
            .map(str::to_owned)
            .collect())
    }

    fn hand_off(
        &self,
        work_order: &WorkOrderSummary,
        options: &RebaselineOptions,
    ) -> Result<bool, RunError> {
        if work_order.entries.is_empty() {
            info!("no tests to rebaseline");
            return Ok(false);
        }
        if options.dry_run {
            info!(
                "dry run: not rebaselining {} entries",
                work_order.entries.len()
            );
            return Ok(false);
        }
        self.collab.executor.rebaseline(work_order)?;
        Ok(true)
    }
}

fn add_explicit_tests(
    test_baseline_set: &mut TestBaselineSet<'_>,
    fetched: &FetchedResults,
    tests: &[String],
) {
    for test in tests {
        for build in fetched.builds() {
            test_baseline_set.add(test.clone(), build.clone(), None);
        }
    }
}

/// Returns true if `path` is a baseline file.
pub fn is_baseline_file(path: &str) -> bool {
    BASELINE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Returns the builders in `all_builders` that have neither a finished nor a pending build.
///
/// Pending builds are not missing: they are left to the fetch step, which reports them as
/// unavailable.
pub fn builders_with_no_results(
    all_builders: &BTreeSet<String>,
    builds: &[Build],
) -> BTreeSet<String> {
    let with_builds: BTreeSet<&str> = builds.iter().map(Build::builder_name).collect();
    all_builders
        .iter()
        .filter(|builder| !with_builds.contains(builder.as_str()))
        .cloned()
        .collect()
}
