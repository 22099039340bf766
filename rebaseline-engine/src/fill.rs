// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filling in results for platforms that have none.
//!
//! If a platform has no try job results (for example because its builder is down), the baselines
//! for that platform would otherwise silently fall back to another platform's after
//! optimization. Instead, results from the most similar platform are borrowed explicitly and
//! recorded as such.

use crate::{
    build::{Build, Platform},
    work_order::{TestBaselineSet, WorkOrderWarning},
};
use std::collections::BTreeSet;
use tracing::info;

/// Adds entries to `test_baseline_set` so that every test prefix has an entry for every platform
/// in `all_platforms`.
///
/// For each prefix and each platform with no entry, a build is chosen with
/// [`choose_fill_in_build`] and added for that platform.
pub fn fill_in_missing_results(
    test_baseline_set: &mut TestBaselineSet<'_>,
    all_platforms: &BTreeSet<Platform>,
) {
    let test_prefixes: Vec<String> = test_baseline_set
        .test_prefixes()
        .into_iter()
        .map(str::to_owned)
        .collect();

    for test_prefix in test_prefixes {
        let build_port_pairs = test_baseline_set.build_port_pairs(&test_prefix);
        let present: BTreeSet<&Platform> = build_port_pairs.iter().map(|(_, p)| p).collect();
        let missing_platforms: Vec<&Platform> = all_platforms
            .iter()
            .filter(|platform| !present.contains(platform))
            .collect();
        if missing_platforms.is_empty() {
            continue;
        }

        info!("For {test_prefix}:");
        for platform in missing_platforms {
            let Some(build) = choose_fill_in_build(platform, &build_port_pairs) else {
                // Prefixes only exist because something was added for them.
                continue;
            };
            info!("  Using {build} to supply results for {platform}.");
            test_baseline_set.add(test_prefix.clone(), build.clone(), Some(platform.clone()));
            test_baseline_set.record_warning(WorkOrderWarning::Substituted {
                test_prefix: test_prefix.clone(),
                build: build.clone(),
                target_platform: platform.clone(),
            });
        }
    }
}

/// Chooses a build whose results stand in for `target` in the absence of its own.
///
/// Builds from a platform in the same OS family as `target` are preferred: of those, the first
/// by `(builder name, build number)` is chosen. If there are none, the first of all builds is
/// chosen. Returns `None` only if `build_port_pairs` is empty.
pub fn choose_fill_in_build<'a>(
    target: &Platform,
    build_port_pairs: &'a [(Build, Platform)],
) -> Option<&'a Build> {
    let same_family = build_port_pairs
        .iter()
        .filter(|(_, platform)| platform.same_os_family(target))
        .map(|(build, _)| build)
        .min();
    if same_family.is_some() {
        return same_family;
    }

    build_port_pairs.iter().min().map(|(build, _)| build)
}
