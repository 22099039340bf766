// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [rebaseline-cl](https://crates.io/crates/rebaseline-cl): working out
//! which layout test baselines a change needs from its try job results.
//!
//! For the binary, see the `rebaseline-cl` crate.

pub mod build;
pub mod collab;
pub mod config;
pub mod errors;
pub mod executor;
pub mod fetch;
pub mod fill;
pub mod git;
pub mod orchestrator;
pub mod regressions;
pub mod report;
pub mod results_archive;
pub mod retry_summary;
#[cfg(test)]
mod test_helpers;
pub mod work_order;
