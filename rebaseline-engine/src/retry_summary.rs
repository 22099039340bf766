// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry summaries: the failures a change introduced.

use rebaseline_metadata::RetrySummaryJson;
use std::collections::BTreeSet;
use tracing::warn;

/// Which failures in a build were caused by the change under test.
///
/// Try jobs retry failing tests without the change applied. Failures that reproduce without the
/// change are pre-existing; the rest are listed in the build's retry summary as new failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetrySummary {
    /// Tests that failed only with the change applied.
    NewFailures(BTreeSet<String>),

    /// No usable retry summary exists for the build.
    Unavailable,
}

impl RetrySummary {
    /// Parses a raw retry summary payload.
    ///
    /// A missing payload, or one that isn't a JSON object with a `failures` list of test names,
    /// results in [`RetrySummary::Unavailable`]. Malformed content is logged.
    pub fn parse(content: Option<&str>) -> Self {
        let Some(content) = content else {
            return Self::Unavailable;
        };
        match serde_json::from_str::<RetrySummaryJson>(content) {
            Ok(summary) => Self::NewFailures(summary.failures.into_iter().collect()),
            Err(err) => {
                warn!("unexpected retry summary content ({err}):\n{content}");
                Self::Unavailable
            }
        }
    }

    /// Returns the set of new failures, or `None` if unavailable.
    pub fn new_failures(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::NewFailures(failures) => Some(failures),
            Self::Unavailable => None,
        }
    }

    /// Returns true if no retry summary is available.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}
