// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching try job results from the layout test results archive over HTTP.

use crate::{
    build::Build, collab::ResultsSource, errors::ResultsFetchError, report::TestResultReport,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches results from an HTTP archive laid out as
/// `<base-url>/<builder>/<build number>/layout-test-results/`.
#[derive(Clone, Debug)]
pub struct HttpResultsSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpResultsSource {
    /// The name of the test result report within a build's results directory.
    pub const REPORT_FILE: &'static str = "failing_results.json";

    /// The name of the retry summary within a build's results directory.
    pub const RETRY_SUMMARY_FILE: &'static str = "retry_summary.json";

    /// Creates a new source for the archive at `base_url`, with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent,
        }
    }

    fn fetch_file(&self, build: &Build, file_name: &str) -> Option<String> {
        let build_number = build.build_number()?;
        let url = format!(
            "{}/{file_name}",
            self.results_url(build.builder_name(), build_number)
        );
        match self.get(&url) {
            Ok(body) => Some(body),
            Err(err) => {
                debug!("fetching {url} failed: {}", DisplayErrorChain(&err));
                None
            }
        }
    }

    fn get(&self, url: &str) -> Result<String, ResultsFetchError> {
        debug!("GET {url}");
        let request_error = |err| ResultsFetchError::Request {
            url: url.to_owned(),
            err: Box::new(err),
        };
        let mut response = self.agent.get(url).call().map_err(request_error)?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(request_error)?;
        if body.trim().is_empty() {
            return Err(ResultsFetchError::EmptyBody {
                url: url.to_owned(),
            });
        }
        Ok(body)
    }
}

impl ResultsSource for HttpResultsSource {
    fn results_url(&self, builder_name: &str, build_number: u64) -> String {
        format!(
            "{}/{}/{build_number}/layout-test-results",
            self.base_url,
            archive_builder_name(builder_name)
        )
    }

    fn fetch_results(&self, build: &Build) -> Option<TestResultReport> {
        let body = self.fetch_file(build, Self::REPORT_FILE)?;
        match TestResultReport::parse(&body) {
            Ok(report) => report,
            Err(err) => {
                warn!("results for {build} are not valid JSON: {err}");
                None
            }
        }
    }

    fn fetch_retry_summary(&self, build: &Build) -> Option<String> {
        self.fetch_file(build, Self::RETRY_SUMMARY_FILE)
    }
}

/// Returns the directory name the archive uses for a builder.
///
/// Spaces, dots and parentheses in builder names are replaced with underscores.
pub fn archive_builder_name(builder_name: &str) -> String {
    builder_name
        .chars()
        .map(|c| match c {
            ' ' | '.' | '(' | ')' => '_',
            c => c,
        })
        .collect()
}

struct DisplayErrorChain<'a>(&'a dyn std::error::Error);

impl std::fmt::Display for DisplayErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
