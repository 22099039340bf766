// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test result reports produced by try jobs.

use rebaseline_metadata::{LayoutTestResultsJson, ResultsTrieNode, TestResultJson};
use std::collections::BTreeMap;

/// Final results that indicate the test produced output differing from its baseline.
const MISMATCH_RESULTS: &[&str] = &["TEXT", "IMAGE", "IMAGE+TEXT", "AUDIO"];

/// A snapshot of one build's test run.
///
/// Outcomes are keyed and iterated by test name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestResultReport {
    interrupted: bool,
    revision: Option<String>,
    outcomes: BTreeMap<String, TestOutcome>,
}

impl TestResultReport {
    /// Parses a results document, as uploaded by a try job.
    ///
    /// Returns `Ok(None)` if the document is empty.
    pub fn parse(input: &str) -> Result<Option<Self>, serde_json::Error> {
        Ok(LayoutTestResultsJson::parse(input)?.map(Self::from_json))
    }

    /// Creates a report from a deserialized results document, flattening its results trie.
    pub fn from_json(json: LayoutTestResultsJson) -> Self {
        let mut outcomes = BTreeMap::new();
        for (component, node) in &json.tests {
            flatten_trie(component.clone(), node, &mut outcomes);
        }

        let revision = json.chromium_revision.and_then(|value| match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Self {
            interrupted: json.interrupted,
            revision,
            outcomes,
        }
    }

    /// Returns true if the test run was interrupted before all tests ran.
    pub fn run_was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns the revision the results were produced at, if recorded.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Returns the outcome for the given test, if the report contains it.
    pub fn outcome_for_test(&self, test_name: &str) -> Option<&TestOutcome> {
        self.outcomes.get(test_name)
    }

    /// Iterates over all outcomes in the report, sorted by test name.
    pub fn outcomes(&self) -> impl Iterator<Item = &TestOutcome> + '_ {
        self.outcomes.values()
    }

    /// Iterates over outcomes whose actual result differed from the expected result.
    pub fn unexpected_outcomes(&self) -> impl Iterator<Item = &TestOutcome> + '_ {
        self.outcomes().filter(|outcome| outcome.is_unexpected())
    }

    /// Returns the number of tests in the report.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the report contains no tests.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

fn flatten_trie(path: String, node: &ResultsTrieNode, out: &mut BTreeMap<String, TestOutcome>) {
    match node {
        ResultsTrieNode::Leaf(result) => {
            let outcome = TestOutcome::from_json(path.clone(), result);
            out.insert(path, outcome);
        }
        ResultsTrieNode::Directory(children) => {
            for (component, child) in children {
                flatten_trie(format!("{path}/{component}"), child, out);
            }
        }
    }
}

/// The outcome of a single test within a [`TestResultReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    test_name: String,
    actual: Vec<String>,
    unexpected: bool,
    missing_baseline: bool,
}

impl TestOutcome {
    /// Creates an outcome from its JSON form.
    pub fn from_json(test_name: impl Into<String>, json: &TestResultJson) -> Self {
        Self {
            test_name: test_name.into(),
            actual: json.actual.split_whitespace().map(str::to_owned).collect(),
            unexpected: json.is_unexpected,
            missing_baseline: json.is_missing_text || json.is_missing_image || json.is_missing_audio,
        }
    }

    /// Returns the name of the test.
    #[inline]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Returns true if the actual result differed from what was expected.
    #[inline]
    pub fn is_unexpected(&self) -> bool {
        self.unexpected
    }

    /// Returns true if the test has no baseline for at least one kind of output.
    #[inline]
    pub fn is_missing_baseline(&self) -> bool {
        self.missing_baseline
    }

    /// Returns true if the final attempt produced output that differs from the baseline.
    pub fn has_mismatch_result(&self) -> bool {
        self.actual
            .last()
            .is_some_and(|last| MISMATCH_RESULTS.contains(&last.as_str()))
    }
}
