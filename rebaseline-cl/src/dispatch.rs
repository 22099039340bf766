// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use rebaseline_engine::{
    collab::RebaselineExecutor,
    config::RebaselineConfig,
    executor::{CommandExecutor, PrintExecutor},
    git::{GitCli, GitClTryJobs},
    orchestrator::{Collaborators, RebaselineOptions, Rebaseliner, RunOutcome},
    results_archive::HttpResultsSource,
};
use tracing::debug;

/// Fetches new baselines for the current change from its try job results.
///
/// By default, the latest try job results for every configured builder are checked, and try jobs
/// are started on builders that have none. Once every builder has results, new baselines are
/// requested for the tests that newly fail under the change.
#[derive(Debug, Parser)]
#[command(
    version,
    bin_name = "rebaseline-cl",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct RebaselineClApp {
    /// Tests to rebaseline, instead of the tests that regressed
    ///
    /// Each test is rebaselined from every build that has results, whether or not it failed.
    #[arg(value_name = "TESTS")]
    tests: Vec<String>,

    /// Work out what to rebaseline, but don't fetch any baselines
    #[arg(long)]
    dry_run: bool,

    /// Only rebaseline tests that the current change adds or modifies
    #[arg(long, conflicts_with = "tests")]
    only_changed_tests: bool,

    /// Don't start try jobs on builders that have no results
    #[arg(long)]
    no_trigger_jobs: bool,

    /// Borrow results from similar platforms for platforms that have none
    #[arg(long)]
    fill_missing: bool,

    /// Ask the executor not to optimize baselines across platforms
    #[arg(long)]
    no_optimize: bool,

    /// Config file [default: <repo-root>/.config/rebaseline.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    #[clap(flatten)]
    output: OutputOpts,
}

impl RebaselineClApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self) -> Result<i32> {
        let repo_root = discover_repo_root()?;
        debug!("repository root: {repo_root}");
        let config = RebaselineConfig::from_sources(&repo_root, self.config_file.as_deref())?;

        let registry = config.builder_registry();
        let changes = GitCli::new(&repo_root, config.git_upstream());
        let builds = GitClTryJobs::new(&repo_root, config.try_master().map(str::to_owned));
        let results = HttpResultsSource::new(config.results_base_url(), config.results_timeout());
        let command_executor = config
            .executor_command()
            .and_then(|command| CommandExecutor::from_command_line(command, &repo_root));
        let executor: &dyn RebaselineExecutor = match &command_executor {
            Some(executor) => executor,
            None => &PrintExecutor,
        };

        let collab = Collaborators {
            changes: &changes,
            builds: &builds,
            results: &results,
            registry: &registry,
            executor,
        };
        let rebaseliner = Rebaseliner::new(collab, config.layout_tests_base_dir());
        let outcome = rebaseliner.run(&self.rebaseline_options())?;
        if let RunOutcome::Completed { work_order, .. } = &outcome {
            debug!(
                "work order has {} entries and {} warnings",
                work_order.entries.len(),
                work_order.warnings.len()
            );
        }
        Ok(outcome.exit_code())
    }

    fn rebaseline_options(&self) -> RebaselineOptions {
        RebaselineOptions {
            tests: self.tests.clone(),
            dry_run: self.dry_run,
            only_changed_tests: self.only_changed_tests,
            trigger_jobs: !self.no_trigger_jobs,
            fill_missing: self.fill_missing,
            no_optimize: self.no_optimize,
        }
    }
}

/// Returns the root of the git checkout containing the current directory.
fn discover_repo_root() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    let command = ["git", "rev-parse", "--show-toplevel"];
    let output = duct::cmd(command[0], &command[1..])
        .dir(&cwd)
        .stdout_capture()
        .unchecked()
        .run()
        .map_err(|err| ExpectedError::repo_root_exec_failed(&command, err))?;
    if !output.status.success() {
        return Err(ExpectedError::repo_root_failed(&command));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|err| ExpectedError::RepoRootInvalidUtf8 { err })?;
    Ok(Utf8Path::new(stdout.trim_end()).to_owned())
}
