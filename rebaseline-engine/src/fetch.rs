// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching test result reports for a set of builds.

use crate::{build::Build, collab::ResultsSource, report::TestResultReport};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Test result reports for the builds whose results could be fetched.
#[derive(Clone, Debug, Default)]
pub struct FetchedResults {
    reports: IndexMap<Build, TestResultReport>,
    unavailable: Vec<Build>,
}

impl FetchedResults {
    /// Returns the report for a build, if it was fetched.
    pub fn get(&self, build: &Build) -> Option<&TestResultReport> {
        self.reports.get(build)
    }

    /// Iterates over fetched builds and their reports, in the order the builds were given.
    pub fn iter(&self) -> impl Iterator<Item = (&Build, &TestResultReport)> + '_ {
        self.reports.iter()
    }

    /// Iterates over the builds that have reports, in the order they were given.
    pub fn builds(&self) -> impl Iterator<Item = &Build> + '_ {
        self.reports.keys()
    }

    /// Returns the builds whose results couldn't be fetched, in the order they were given.
    pub fn unavailable(&self) -> &[Build] {
        &self.unavailable
    }

    /// Returns the number of builds with reports.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Returns true if no reports were fetched.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// Fetches the test result report for each build.
///
/// Builds whose reports can't be fetched (including pending builds) are left out of the returned
/// map and logged with the information needed to follow up by hand. No retries are attempted.
pub fn fetch_results(source: &dyn ResultsSource, builds: &[Build]) -> FetchedResults {
    let mut fetched = FetchedResults::default();
    for build in builds {
        if fetched.reports.contains_key(build) || fetched.unavailable.contains(build) {
            continue;
        }

        let Some(build_number) = build.build_number() else {
            info!("no results for {build}: the build hasn't finished yet");
            fetched.unavailable.push(build.clone());
            continue;
        };

        let results_url = source.results_url(build.builder_name(), build_number);
        debug!("fetching results for {build} from {results_url}");
        match source.fetch_results(build) {
            Some(report) => {
                debug!(
                    "fetched {} results for {build} at revision {}",
                    report.len(),
                    report.revision().unwrap_or("<unknown>"),
                );
                if report.run_was_interrupted() {
                    warn!("test run for {build} was interrupted, so its results may be incomplete");
                }
                fetched.reports.insert(build.clone(), report);
            }
            None => {
                info!("failed to fetch results for {build}");
                info!("results URL: {results_url}/results.html");
                info!(
                    "retry job by running: {}",
                    shell_words::join(["git", "cl", "try", "-b", build.builder_name()])
                );
                fetched.unavailable.push(build.clone());
            }
        }
    }
    fetched
}
