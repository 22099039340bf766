// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// One try job, as reported by `git cl try-results --json`.
///
/// Only the fields used for rebaselining are described here; the rest are ignored.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TryJobJson {
    /// The builder the job ran (or will run) on.
    pub builder_name: String,

    /// The job's status, for example `SCHEDULED`, `STARTED` or `COMPLETED`.
    #[serde(default)]
    pub status: Option<String>,

    /// The job's result once completed, for example `SUCCESS` or `FAILURE`.
    #[serde(default)]
    pub result: Option<String>,

    /// The URL of the build. Jobs that haven't started yet have no URL.
    #[serde(default)]
    pub url: Option<String>,
}

impl TryJobJson {
    /// Returns the build number encoded in the job's URL, which is of the form
    /// `.../builds/<number>` (with an optional trailing slash).
    ///
    /// Returns `None` if the job has no URL yet, or if the URL doesn't end in a build number.
    pub fn build_number(&self) -> Option<u64> {
        let url = self.url.as_deref()?;
        let url = url.strip_suffix('/').unwrap_or(url);
        let (rest, number) = url.rsplit_once('/')?;
        if !rest.ends_with("/builds") && rest != "builds" {
            return None;
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        number.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("https://ci.example/p/builders/linux_rel/builds/123"), Some(123); "plain")]
    #[test_case(Some("https://ci.example/p/builders/linux_rel/builds/7/"), Some(7); "trailing slash")]
    #[test_case(Some("https://ci.example/p/builders/linux_rel/builds/"), None; "no number")]
    #[test_case(Some("https://ci.example/p/builders/linux_rel/logs/12"), None; "not a build URL")]
    #[test_case(Some("https://ci.example/builds/12a"), None; "not numeric")]
    #[test_case(None, None; "no url")]
    fn build_number_from_url(url: Option<&str>, expected: Option<u64>) {
        let job = TryJobJson {
            builder_name: "linux_rel".to_owned(),
            status: None,
            result: None,
            url: url.map(str::to_owned),
        };
        assert_eq!(job.build_number(), expected);
    }
}
