// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working out which tests a change broke on a build.

use crate::{
    build::Build, collab::ResultsSource, report::TestResultReport, retry_summary::RetrySummary,
};
use itertools::Itertools;
use tracing::warn;

/// The tests to rebaseline for one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildRegressions {
    /// Test names, sorted and de-duplicated.
    pub tests: Vec<String>,

    /// False if no retry summary was available, so `tests` may include pre-existing failures.
    pub filtered_by_retry_summary: bool,
}

/// Fetches the retry summary for `build` and returns the tests that should be rebaselined.
///
/// See [`tests_to_rebaseline`] for the selection rules.
pub fn fetch_tests_to_rebaseline(
    source: &dyn ResultsSource,
    build: &Build,
    report: &TestResultReport,
) -> BuildRegressions {
    let content = source.fetch_retry_summary(build);
    let retry_summary = RetrySummary::parse(content.as_deref());
    if retry_summary.is_unavailable() {
        warn!("no retry summary available for {build}");
    }
    BuildRegressions {
        tests: tests_to_rebaseline(report, &retry_summary),
        filtered_by_retry_summary: !retry_summary.is_unavailable(),
    }
}

/// Returns the tests in `report` that should be rebaselined, sorted and de-duplicated.
///
/// A test is a candidate if its result was unexpected and it is either missing a baseline or its
/// output mismatched the baseline. If a retry summary is available, candidates that aren't new
/// failures are dropped. Otherwise all candidates are kept.
pub fn tests_to_rebaseline(report: &TestResultReport, retry_summary: &RetrySummary) -> Vec<String> {
    let candidates = report
        .unexpected_outcomes()
        .filter(|outcome| outcome.is_missing_baseline() || outcome.has_mismatch_result())
        .map(|outcome| outcome.test_name());

    match retry_summary.new_failures() {
        Some(new_failures) => candidates
            .filter(|test| new_failures.contains(*test))
            .map(str::to_owned)
            .sorted()
            .dedup()
            .collect(),
        None => candidates.map(str::to_owned).sorted().dedup().collect(),
    }
}
