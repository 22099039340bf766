// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of the JSONP envelope that result archives wrap around `failing_results.json`.
pub const JSONP_PREFIX: &str = "ADD_RESULTS(";

/// Suffix of the JSONP envelope that result archives wrap around `failing_results.json`.
pub const JSONP_SUFFIX: &str = ");";

/// Strips the `ADD_RESULTS(...);` envelope from a results document, if present.
///
/// Surrounding whitespace is ignored. Input without the envelope is returned trimmed but otherwise
/// unchanged.
pub fn strip_jsonp_wrapper(input: &str) -> &str {
    let trimmed = input.trim();
    trimmed
        .strip_prefix(JSONP_PREFIX)
        .and_then(|rest| rest.strip_suffix(JSONP_SUFFIX))
        .unwrap_or(trimmed)
}

/// The root of a layout test results document, as uploaded by a try job.
///
/// Unknown keys are ignored: result documents carry many fields (timings, flag sets, and so on)
/// that rebaselining doesn't care about.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LayoutTestResultsJson {
    /// The results trie, keyed by the first path component of each test.
    #[serde(default)]
    pub tests: BTreeMap<String, ResultsTrieNode>,

    /// True if the test run was interrupted before all tests ran.
    #[serde(default)]
    pub interrupted: bool,

    /// The builder that produced these results, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_name: Option<String>,

    /// The revision the results were produced at. Archives have stored this both as a string and
    /// as a number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromium_revision: Option<serde_json::Value>,
}

impl LayoutTestResultsJson {
    /// Parses a results document, stripping a JSONP envelope if present.
    ///
    /// Returns `Ok(None)` for empty input and for documents that are `null` or an empty object.
    pub fn parse(input: &str) -> Result<Option<Self>, serde_json::Error> {
        let content = strip_jsonp_wrapper(input);
        if content.is_empty() {
            return Ok(None);
        }
        let value: serde_json::Value = serde_json::from_str(content)?;
        match &value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => return Ok(None),
            _ => {}
        }
        serde_json::from_value(value).map(Some)
    }
}

/// A node in the results trie.
///
/// Interior nodes are directories keyed by path component. Leaves are recognized by the presence
/// of an `actual` key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResultsTrieNode {
    /// The result for a single test.
    Leaf(TestResultJson),

    /// A directory of further nodes.
    Directory(BTreeMap<String, ResultsTrieNode>),
}

/// The result of a single layout test within a results trie.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestResultJson {
    /// Space-separated actual results, one per attempt. The last token is the final retry.
    pub actual: String,

    /// Space-separated expected results.
    #[serde(default)]
    pub expected: String,

    /// True if the actual result didn't match any expectation.
    #[serde(default)]
    pub is_unexpected: bool,

    /// True if the test has no text baseline.
    #[serde(default)]
    pub is_missing_text: bool,

    /// True if the test has no image baseline.
    #[serde(default)]
    pub is_missing_image: bool,

    /// True if the test has no audio baseline.
    #[serde(default)]
    pub is_missing_audio: bool,
}

/// The retry summary uploaded by a try job: the failures that reproduced with the patch applied,
/// but not without it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetrySummaryJson {
    /// Tests that failed only with the patch applied.
    pub failures: Vec<String>,

    /// Tests that were ignored while computing the summary.
    #[serde(default)]
    pub ignored: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use test_case::test_case;

    #[test_case("ADD_RESULTS({\"a\": 1});", "{\"a\": 1}"; "wrapped")]
    #[test_case("  ADD_RESULTS({});\n", "{}"; "wrapped with whitespace")]
    #[test_case("{\"a\": 1}", "{\"a\": 1}"; "bare")]
    #[test_case("ADD_RESULTS({}", "ADD_RESULTS({}"; "missing suffix")]
    #[test_case("", ""; "empty")]
    fn strip_wrapper(input: &str, expected: &str) {
        assert_eq!(strip_jsonp_wrapper(input), expected);
    }

    #[test]
    fn parse_trie() {
        let input = indoc! {r#"
            ADD_RESULTS({
                "tests": {
                    "fast": {
                        "dom": {
                            "a.html": {
                                "expected": "PASS",
                                "actual": "IMAGE",
                                "is_unexpected": true,
                                "time": 0.3
                            }
                        },
                        "b.html": {"expected": "PASS", "actual": "PASS"}
                    }
                },
                "interrupted": false,
                "builder_name": "linux_trusty_blink_rel",
                "chromium_revision": 456789,
                "version": 3
            });
        "#};

        let results = LayoutTestResultsJson::parse(input)
            .expect("parse succeeded")
            .expect("results are present");
        assert_eq!(results.builder_name.as_deref(), Some("linux_trusty_blink_rel"));
        assert!(!results.interrupted);

        let ResultsTrieNode::Directory(fast) = &results.tests["fast"] else {
            panic!("fast is a directory");
        };
        let ResultsTrieNode::Leaf(b) = &fast["b.html"] else {
            panic!("b.html is a leaf");
        };
        assert_eq!(b.actual, "PASS");
        assert!(!b.is_unexpected);

        let ResultsTrieNode::Directory(dom) = &fast["dom"] else {
            panic!("dom is a directory");
        };
        let ResultsTrieNode::Leaf(a) = &dom["a.html"] else {
            panic!("a.html is a leaf");
        };
        assert!(a.is_unexpected);
        assert!(!a.is_missing_image);
    }

    #[test_case(""; "empty")]
    #[test_case("null"; "null")]
    #[test_case("ADD_RESULTS({});"; "empty object")]
    fn parse_absent(input: &str) {
        assert_eq!(LayoutTestResultsJson::parse(input).expect("parse succeeded"), None);
    }

    #[test]
    fn parse_invalid() {
        LayoutTestResultsJson::parse("ADD_RESULTS(not json);").expect_err("invalid JSON");
    }

    #[test]
    fn retry_summary_ignored_is_optional() {
        let summary: RetrySummaryJson =
            serde_json::from_str(r#"{"failures": ["a.html"]}"#).expect("valid summary");
        assert_eq!(summary.failures, vec!["a.html".to_owned()]);
        assert!(summary.ignored.is_empty());
    }
}
