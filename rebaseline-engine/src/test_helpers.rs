// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborators for tests.

use crate::{
    build::{Build, Platform},
    collab::{BuildSource, ChangeSource, PlatformRegistry, RebaselineExecutor, ResultsSource},
    errors::{CollaboratorError, ExecutorError},
    report::TestResultReport,
};
use rebaseline_metadata::WorkOrderSummary;
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

pub(crate) fn report(json: &str) -> TestResultReport {
    TestResultReport::parse(json)
        .expect("test report is valid JSON")
        .expect("test report is non-empty")
}

#[derive(Debug, Default)]
pub(crate) struct FakeRegistry {
    builders: BTreeMap<String, Platform>,
}

impl FakeRegistry {
    pub(crate) fn new<'a>(builders: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            builders: builders
                .into_iter()
                .map(|(builder, platform)| (builder.to_owned(), Platform::new(platform)))
                .collect(),
        }
    }
}

impl PlatformRegistry for FakeRegistry {
    fn all_supported_builders(&self) -> BTreeSet<String> {
        self.builders.keys().cloned().collect()
    }

    fn platform_for_builder(&self, builder_name: &str) -> Platform {
        self.builders
            .get(builder_name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown builder {builder_name} in test"))
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeChangeSource {
    pub(crate) change_id: Option<u64>,
    pub(crate) changed_files: Vec<String>,
    pub(crate) unstaged: Vec<String>,
}

impl ChangeSource for FakeChangeSource {
    fn current_change_id(&self) -> Result<Option<u64>, CollaboratorError> {
        Ok(self.change_id)
    }

    fn changed_file_paths(&self, _diff_filter: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.changed_files.clone())
    }

    fn unstaged_files(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.unstaged.clone())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeBuildSource {
    pub(crate) builds: Vec<Build>,
    pub(crate) triggered: RefCell<Vec<BTreeSet<String>>>,
}

impl BuildSource for FakeBuildSource {
    fn latest_builds(&self, builders: &BTreeSet<String>) -> Result<Vec<Build>, CollaboratorError> {
        Ok(self
            .builds
            .iter()
            .filter(|build| builders.contains(build.builder_name()))
            .cloned()
            .collect())
    }

    fn trigger_builds(&self, builders: &BTreeSet<String>) -> Result<(), CollaboratorError> {
        self.triggered.borrow_mut().push(builders.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeResultsSource {
    pub(crate) reports: BTreeMap<Build, TestResultReport>,
    pub(crate) retry_summaries: BTreeMap<Build, String>,
    pub(crate) fetched: RefCell<Vec<Build>>,
}

impl FakeResultsSource {
    pub(crate) fn with_report(mut self, build: Build, json: &str) -> Self {
        self.reports.insert(build, report(json));
        self
    }

    pub(crate) fn with_retry_summary(mut self, build: Build, content: &str) -> Self {
        self.retry_summaries.insert(build, content.to_owned());
        self
    }
}

impl ResultsSource for FakeResultsSource {
    fn results_url(&self, builder_name: &str, build_number: u64) -> String {
        format!("https://results.example/{builder_name}/{build_number}/layout-test-results")
    }

    fn fetch_results(&self, build: &Build) -> Option<TestResultReport> {
        self.fetched.borrow_mut().push(build.clone());
        self.reports.get(build).cloned()
    }

    fn fetch_retry_summary(&self, build: &Build) -> Option<String> {
        self.retry_summaries.get(build).cloned()
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeExecutor {
    pub(crate) received: RefCell<Vec<WorkOrderSummary>>,
}

impl RebaselineExecutor for FakeExecutor {
    fn rebaseline(&self, work_order: &WorkOrderSummary) -> Result<(), ExecutorError> {
        self.received.borrow_mut().push(work_order.clone());
        Ok(())
    }
}
