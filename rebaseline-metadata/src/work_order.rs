// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// The serialized form of a baseline work order, handed to the rebaseline executor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct WorkOrderSummary {
    /// Whether the executor should skip cross-platform baseline optimization.
    #[serde(default)]
    pub no_optimize: bool,

    /// Baselines to fetch, sorted by test, then build, then platform.
    pub entries: Vec<WorkOrderEntrySummary>,

    /// Approximations made while building the work order.
    #[serde(default)]
    pub warnings: Vec<WorkOrderWarningSummary>,
}

/// A single fetch obligation: the baseline for `test` on `platform`, taken from a build.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub struct WorkOrderEntrySummary {
    /// The test, or a directory of tests.
    pub test: String,

    /// The builder whose results supply the baseline.
    pub builder_name: String,

    /// The build number on that builder.
    pub build_number: Option<u64>,

    /// The platform the baseline is written for.
    pub platform: String,
}

/// An approximation recorded while building a work order.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkOrderWarningSummary {
    /// Results couldn't be fetched for a build, so its regressions are not in the work order.
    #[serde(rename_all = "kebab-case")]
    ResultsUnavailable {
        /// The builder.
        builder_name: String,
        /// The build number, if the build had one.
        build_number: Option<u64>,
    },

    /// No usable retry summary existed for a build, so pre-existing failures may be included.
    #[serde(rename_all = "kebab-case")]
    RetrySummaryUnavailable {
        /// The builder.
        builder_name: String,
        /// The build number, if the build had one.
        build_number: Option<u64>,
    },

    /// A platform without results borrowed another build's results.
    #[serde(rename_all = "kebab-case")]
    Substituted {
        /// The test or directory the substitution applies to.
        test_prefix: String,
        /// The builder whose results were borrowed.
        builder_name: String,
        /// The build number on that builder.
        build_number: Option<u64>,
        /// The platform that had no results.
        target_platform: String,
    },
}
