// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Try-job builds and the platforms they produce results for.

use std::fmt;

/// One try-job run on a builder.
///
/// A build without a number is pending: it has been scheduled or started but hasn't produced
/// results yet. A pending build is distinct from any finished build on the same builder.
///
/// Builds are ordered by builder name, then by build number, with pending builds sorting before
/// finished ones.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Build {
    builder_name: String,
    build_number: Option<u64>,
}

impl Build {
    /// Creates a new build.
    pub fn new(builder_name: impl Into<String>, build_number: impl Into<Option<u64>>) -> Self {
        Self {
            builder_name: builder_name.into(),
            build_number: build_number.into(),
        }
    }

    /// Creates a pending build: one that has no build number yet.
    pub fn pending(builder_name: impl Into<String>) -> Self {
        Self::new(builder_name, None)
    }

    /// Returns the name of the builder this build ran on.
    #[inline]
    pub fn builder_name(&self) -> &str {
        &self.builder_name
    }

    /// Returns the build number, or `None` if the build is pending.
    #[inline]
    pub fn build_number(&self) -> Option<u64> {
        self.build_number
    }

    /// Returns true if this build has no build number yet.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.build_number.is_none()
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build_number {
            Some(number) => write!(f, "{} build {}", self.builder_name, number),
            None => write!(f, "{} (pending)", self.builder_name),
        }
    }
}

/// A platform that baselines are written for, for example `win-win7` or `linux-trusty`.
///
/// Platform identifiers are of the form `<os>[-<version>]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Platform(String);

impl Platform {
    /// Creates a new platform identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the OS family of this platform: everything before the final `-`, or the whole
    /// identifier if it has no `-`.
    ///
    /// For `win-win7` this is `win`. For identifiers with more components, such as
    /// `test-mac-mac10.10`, everything up to the last component is the family (`test-mac`).
    pub fn os_family(&self) -> &str {
        match self.0.rfind('-') {
            Some(index) => &self.0[..index],
            None => &self.0,
        }
    }

    /// Returns true if `other` belongs to the same OS family as this platform.
    pub fn same_os_family(&self, other: &Platform) -> bool {
        self.os_family() == other.os_family()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
