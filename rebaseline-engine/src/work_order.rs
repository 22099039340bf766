// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The baseline work order: which baselines to fetch, from which builds, for which platforms.

use crate::{
    build::{Build, Platform},
    collab::PlatformRegistry,
};
use rebaseline_metadata::{WorkOrderEntrySummary, WorkOrderSummary, WorkOrderWarningSummary};
use std::{collections::BTreeSet, fmt};
use swrite::{SWrite, swrite};

/// One fetch obligation: the baseline for `test` on `platform`, taken from `build`'s results.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaselineEntry {
    /// The test, or a directory of tests.
    pub test: String,

    /// The build whose results supply the baseline.
    pub build: Build,

    /// The platform the baseline is written for.
    pub platform: Platform,
}

/// An approximation made while building a work order.
///
/// These are logged as they happen, and also carried by the work order so that downstream tools
/// can surface them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkOrderWarning {
    /// The build's results couldn't be fetched, so its regressions are missing.
    ResultsUnavailable(Build),

    /// The build had no usable retry summary, so pre-existing failures may be included.
    RetrySummaryUnavailable(Build),

    /// `target_platform` had no results for `test_prefix`, so results from `build` were borrowed.
    Substituted {
        /// The test or directory of tests.
        test_prefix: String,

        /// The build whose results were borrowed.
        build: Build,

        /// The platform that had no results.
        target_platform: Platform,
    },
}

/// The set of baselines to fetch for a rebaseline run.
///
/// Conceptually a map from test name to a set of `(Build, Platform)` pairs. Entries are kept in a
/// single sorted set; per-prefix views are computed when queried.
#[derive(Clone)]
pub struct TestBaselineSet<'a> {
    registry: &'a dyn PlatformRegistry,
    entries: BTreeSet<BaselineEntry>,
    warnings: Vec<WorkOrderWarning>,
}

impl<'a> TestBaselineSet<'a> {
    /// Creates an empty work order. Platforms for builds are looked up in `registry`.
    pub fn new(registry: &'a dyn PlatformRegistry) -> Self {
        Self {
            registry,
            entries: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an entry for `test`, fetched from `build`.
    ///
    /// `platform` defaults to the platform of `build`'s builder. Adding an entry that already
    /// exists does nothing.
    pub fn add(&mut self, test: impl Into<String>, build: Build, platform: Option<Platform>) {
        let platform =
            platform.unwrap_or_else(|| self.registry.platform_for_builder(build.builder_name()));
        self.entries.insert(BaselineEntry {
            test: test.into(),
            build,
            platform,
        });
    }

    /// Records an approximation made while building this work order.
    pub fn record_warning(&mut self, warning: WorkOrderWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Returns the approximations recorded so far, in the order they were made.
    pub fn warnings(&self) -> &[WorkOrderWarning] {
        &self.warnings
    }

    /// Returns the distinct tests (or directories of tests) in the work order, sorted.
    pub fn test_prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.entries.iter().map(|e| e.test.as_str()).collect();
        prefixes.dedup();
        prefixes
    }

    /// Returns all `(Build, Platform)` pairs recorded for `prefix` or any test under it, sorted
    /// and de-duplicated.
    ///
    /// A test is under `prefix` if it is equal to it, or if it continues it with a path
    /// component: `fast/dom` covers `fast/dom/a.html` but not `fast/domain.html`.
    pub fn build_port_pairs(&self, prefix: &str) -> Vec<(Build, Platform)> {
        let pairs: BTreeSet<(Build, Platform)> = self
            .entries
            .iter()
            .skip_while(|entry| entry.test.as_str() < prefix)
            .take_while(|entry| entry.test.starts_with(prefix))
            .filter(|entry| is_under_prefix(&entry.test, prefix))
            .map(|entry| (entry.build.clone(), entry.platform.clone()))
            .collect();
        pairs.into_iter().collect()
    }

    /// Returns the names of all builders that supply results in this work order.
    pub fn all_builders(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .map(|entry| entry.build.builder_name())
            .collect()
    }

    /// Iterates over all entries, sorted by test, then build, then platform.
    pub fn iter(&self) -> impl Iterator<Item = &BaselineEntry> + '_ {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there is nothing to rebaseline.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts this work order to its serialized form.
    pub fn to_summary(&self, no_optimize: bool) -> WorkOrderSummary {
        let entries = self
            .entries
            .iter()
            .map(|entry| WorkOrderEntrySummary {
                test: entry.test.clone(),
                builder_name: entry.build.builder_name().to_owned(),
                build_number: entry.build.build_number(),
                platform: entry.platform.as_str().to_owned(),
            })
            .collect();
        let warnings = self.warnings.iter().map(warning_summary).collect();
        WorkOrderSummary {
            no_optimize,
            entries,
            warnings,
        }
    }
}

impl fmt::Debug for TestBaselineSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBaselineSet")
            .field("entries", &self.entries)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TestBaselineSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("<Empty TestBaselineSet>");
        }
        let mut out = String::from("<TestBaselineSet with:");
        for entry in &self.entries {
            swrite!(out, "\n  {}: {}, {}", entry.test, entry.build, entry.platform);
        }
        out.push('>');
        f.write_str(&out)
    }
}

fn is_under_prefix(test: &str, prefix: &str) -> bool {
    match test.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => prefix.is_empty() || prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

fn warning_summary(warning: &WorkOrderWarning) -> WorkOrderWarningSummary {
    match warning {
        WorkOrderWarning::ResultsUnavailable(build) => WorkOrderWarningSummary::ResultsUnavailable {
            builder_name: build.builder_name().to_owned(),
            build_number: build.build_number(),
        },
        WorkOrderWarning::RetrySummaryUnavailable(build) => {
            WorkOrderWarningSummary::RetrySummaryUnavailable {
                builder_name: build.builder_name().to_owned(),
                build_number: build.build_number(),
            }
        }
        WorkOrderWarning::Substituted {
            test_prefix,
            build,
            target_platform,
        } => WorkOrderWarningSummary::Substituted {
            test_prefix: test_prefix.clone(),
            builder_name: build.builder_name().to_owned(),
            build_number: build.build_number(),
            target_platform: target_platform.as_str().to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeRegistry;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use test_strategy::proptest;

    fn registry() -> FakeRegistry {
        FakeRegistry::new([
            ("linux_rel", "linux-trusty"),
            ("win7_rel", "win-win7"),
            ("win10_rel", "win-win10"),
        ])
    }

    #[test]
    fn add_defaults_platform_from_builder() {
        let registry = registry();
        let mut set = TestBaselineSet::new(&registry);
        set.add("fast/a.html", Build::new("win7_rel", 3), None);
        set.add(
            "fast/a.html",
            Build::new("win7_rel", 3),
            Some(Platform::new("win-win10")),
        );

        let pairs = set.build_port_pairs("fast/a.html");
        assert_eq!(
            pairs,
            vec![
                (Build::new("win7_rel", 3), Platform::new("win-win10")),
                (Build::new("win7_rel", 3), Platform::new("win-win7")),
            ]
        );
    }

    #[test]
    fn add_is_idempotent() {
        let registry = registry();
        let mut once = TestBaselineSet::new(&registry);
        once.add("fast/a.html", Build::new("linux_rel", 1), None);

        let mut twice = TestBaselineSet::new(&registry);
        twice.add("fast/a.html", Build::new("linux_rel", 1), None);
        twice.add("fast/a.html", Build::new("linux_rel", 1), None);
        twice.add(
            "fast/a.html",
            Build::new("linux_rel", 1),
            Some(Platform::new("linux-trusty")),
        );

        assert_eq!(once.len(), 1);
        assert_eq!(
            once.iter().collect::<Vec<_>>(),
            twice.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_prefixes_sorted_and_distinct() {
        let registry = registry();
        let mut set = TestBaselineSet::new(&registry);
        set.add("fast/b.html", Build::new("linux_rel", 1), None);
        set.add("fast/a.html", Build::new("linux_rel", 1), None);
        set.add("fast/a.html", Build::new("win7_rel", 2), None);
        set.add("editing", Build::new("win7_rel", 2), None);

        assert_eq!(set.test_prefixes(), ["editing", "fast/a.html", "fast/b.html"]);
        assert_eq!(set.all_builders(), BTreeSet::from(["linux_rel", "win7_rel"]));
    }

    #[test_case("fast", &["linux_rel", "win7_rel"]; "directory")]
    #[test_case("fast/", &["linux_rel", "win7_rel"]; "directory with slash")]
    #[test_case("fast/dom", &["win7_rel"]; "subdirectory")]
    #[test_case("fast/dom/a.html", &["win7_rel"]; "exact test")]
    // fast/domain.html is under "fast" but not "fast/dom".
    #[test_case("fast/do", &[]; "partial component")]
    #[test_case("editing", &[]; "absent")]
    fn build_port_pairs_by_prefix(prefix: &str, expected_builders: &[&str]) {
        let registry = registry();
        let mut set = TestBaselineSet::new(&registry);
        set.add("fast/dom/a.html", Build::new("win7_rel", 2), None);
        set.add("fast/domain.html", Build::new("linux_rel", 1), None);
        set.add("fast/top.html", Build::new("linux_rel", 1), None);

        let builders: Vec<_> = set
            .build_port_pairs(prefix)
            .into_iter()
            .map(|(build, _)| build.builder_name().to_owned())
            .collect();
        assert_eq!(builders, expected_builders);
    }

    #[test]
    fn display() {
        let registry = registry();
        let mut set = TestBaselineSet::new(&registry);
        assert_eq!(set.to_string(), "<Empty TestBaselineSet>");

        set.add("fast/a.html", Build::new("linux_rel", 1), None);
        set.add("fast/a.html", Build::new("win7_rel", 2), None);
        assert_eq!(
            set.to_string(),
            "<TestBaselineSet with:\n  \
             fast/a.html: linux_rel build 1, linux-trusty\n  \
             fast/a.html: win7_rel build 2, win-win7>"
        );
    }

    #[test]
    fn summary() {
        let registry = registry();
        let mut set = TestBaselineSet::new(&registry);
        set.add("fast/a.html", Build::new("win7_rel", 2), None);
        set.record_warning(WorkOrderWarning::ResultsUnavailable(Build::pending("linux_rel")));
        set.record_warning(WorkOrderWarning::ResultsUnavailable(Build::pending("linux_rel")));

        let summary = set.to_summary(true);
        assert!(summary.no_optimize);
        assert_eq!(
            summary.entries,
            vec![WorkOrderEntrySummary {
                test: "fast/a.html".to_owned(),
                builder_name: "win7_rel".to_owned(),
                build_number: Some(2),
                platform: "win-win7".to_owned(),
            }]
        );
        assert_eq!(
            summary.warnings,
            vec![WorkOrderWarningSummary::ResultsUnavailable {
                builder_name: "linux_rel".to_owned(),
                build_number: None,
            }],
            "duplicate warnings are recorded once"
        );
    }

    #[proptest]
    fn add_twice_matches_add_once(
        #[strategy(proptest::collection::vec(("[a-c]{1,2}(/[a-c]{1,2})?", 0..3usize, 0..4u64), 0..16))]
        adds: Vec<(String, usize, u64)>,
    ) {
        const BUILDERS: [&str; 3] = ["linux_rel", "win7_rel", "win10_rel"];
        let registry = registry();
        let mut once = TestBaselineSet::new(&registry);
        let mut twice = TestBaselineSet::new(&registry);
        for (test, builder, number) in &adds {
            let build = Build::new(BUILDERS[*builder], *number);
            once.add(test.clone(), build.clone(), None);
            twice.add(test.clone(), build.clone(), None);
            twice.add(test.clone(), build, None);
        }
        proptest::prop_assert_eq!(
            once.iter().collect::<Vec<_>>(),
            twice.iter().collect::<Vec<_>>()
        );
    }
}
