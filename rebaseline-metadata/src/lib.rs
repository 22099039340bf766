// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Documented exit codes and JSON formats for `rebaseline-cl`.
//!
//! This crate describes the documents `rebaseline-cl` consumes (layout test result tries, retry
//! summaries, try-job listings) and the work order it hands to downstream tools.

mod exit_codes;
mod results;
mod try_jobs;
mod work_order;

pub use exit_codes::*;
pub use results::*;
pub use try_jobs::*;
pub use work_order::*;
