//! Release version parsing and lineage resolution.
use std::fmt;

use crate::error::{RelogError, Result};

/// Branch receiving minor releases.
pub const MAINLINE_BRANCH: &str = "main";

/// A release version with exactly three numeric components.
///
/// Ordering is lexicographic by major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse an `X.Y.Z` version string. Pre-release and build metadata are
    /// rejected: release versions are always plain three-component versions.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = semver::Version::parse(input).map_err(|e| {
            RelogError::invalid_version(format!("{}: {}", input, e))
        })?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(RelogError::invalid_version(format!(
                "{}: pre-release and build metadata are not supported",
                input
            )));
        }

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The release preceding this one.
    ///
    /// The first minor of a major line has no earlier minor, so `X.0.0`
    /// maps to itself rather than failing.
    pub fn previous_release(&self) -> Version {
        if self.patch > 0 {
            return Version::new(self.major, self.minor, self.patch - 1);
        }

        if self.minor > 0 {
            return Version::new(self.major, self.minor - 1, 0);
        }

        Version::new(self.major, 0, 0)
    }

    /// The branch a release is cut from: minor releases come from the
    /// mainline, patch releases from their per-minor release branch.
    pub fn branch(&self) -> String {
        if self.patch == 0 {
            return MAINLINE_BRANCH.to_string();
        }

        format!("release-{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
