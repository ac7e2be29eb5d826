//! Semantic versioning for ABI entities.
//!
//! Versions are strictly `MAJOR.MINOR.PATCH`. Stored strings may carry a
//! `-suffix` label, which format checks tolerate but numeric comparison and
//! bumping never read.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A parsed semantic version.
pub type Version = semver::Version;

/// Version assigned to a newly created entity.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Errors from version parsing and derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Not exactly three dot-separated non-negative integers.
    #[error("invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    Invalid(String),

    /// Unknown bump kind label.
    #[error("invalid bump kind '{0}': expected major, minor or patch")]
    InvalidBump(String),

    /// The bumped component does not fit in a `u64`.
    #[error("cannot bump {kind} of version {version}: component overflows")]
    Overflow { version: String, kind: BumpKind },
}

/// Which component of a version to increment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    #[default]
    Patch,
}

impl BumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            _ => Err(VersionError::InvalidBump(s.to_string())),
        }
    }
}

/// Parse a version string like "1.2.3".
///
/// Pre-release and build suffixes are rejected. Numeric components may carry
/// leading zeros.
pub fn parse(s: &str) -> Result<Version, VersionError> {
    let invalid = || VersionError::Invalid(s.to_string());
    let version = Version::parse(&strip_leading_zeros(s)).map_err(|_| invalid())?;
    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(invalid());
    }
    Ok(version)
}

/// `semver` refuses "01"; collapse such components to their numeric value.
fn strip_leading_zeros(s: &str) -> Cow<'_, str> {
    let padded = |part: &str| {
        part.len() > 1 && part.starts_with('0') && part.bytes().all(|b| b.is_ascii_digit())
    };
    if !s.split('.').any(padded) {
        return Cow::Borrowed(s);
    }
    let parts: Vec<&str> = s
        .split('.')
        .map(|part| match part.trim_start_matches('0') {
            "" if padded(part) => "0",
            stripped if padded(part) => stripped,
            _ => part,
        })
        .collect();
    Cow::Owned(parts.join("."))
}

/// Render a version as `MAJOR.MINOR.PATCH`.
pub fn format(version: &Version) -> String {
    format!("{}.{}.{}", version.major, version.minor, version.patch)
}

/// Whether a stored version string is well-formed, tolerating a `-suffix`.
pub fn is_valid_format(s: &str) -> bool {
    let (core, suffix) = match s.split_once('-') {
        Some((core, suffix)) => (core, Some(suffix)),
        None => (s, None),
    };
    let suffix_ok = suffix.map_or(true, |sfx| {
        !sfx.is_empty()
            && sfx
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    });
    suffix_ok && parse(core).is_ok()
}

/// Compute the next version given the current version and the bump kind.
pub fn bump_version(current: &Version, kind: BumpKind) -> Result<Version, VersionError> {
    let overflow = || VersionError::Overflow {
        version: format(current),
        kind,
    };
    let next = match kind {
        BumpKind::Patch => Version::new(
            current.major,
            current.minor,
            current.patch.checked_add(1).ok_or_else(overflow)?,
        ),
        BumpKind::Minor => {
            Version::new(current.major, current.minor.checked_add(1).ok_or_else(overflow)?, 0)
        }
        BumpKind::Major => Version::new(current.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
    };
    Ok(next)
}

/// Bump a version string.
pub fn bump(current: &str, kind: BumpKind) -> Result<String, VersionError> {
    Ok(format(&bump_version(&parse(current)?, kind)?))
}

/// Compare two version strings by (major, minor, patch).
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionError> {
    let a = parse(a)?;
    let b = parse(b)?;
    Ok((a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch)))
}

/// Inputs to [`next_version`].
#[derive(Debug, Clone, Default)]
pub struct NextVersionOptions<'a> {
    /// Caller-supplied version; takes priority when present.
    pub explicit: Option<&'a str>,
    /// Whether the entity is being created.
    pub is_new: bool,
    /// Version string of the latest recorded version.
    pub latest: Option<&'a str>,
    /// Requested bump; patch when absent.
    pub bump: Option<BumpKind>,
}

/// Resolve the version string for a create or update.
///
/// Priority: an explicit version, then `1.0.0` for new entities or when no
/// previous version exists, then a bump of the latest version.
pub fn next_version(options: &NextVersionOptions<'_>) -> Result<String, VersionError> {
    if let Some(explicit) = options.explicit {
        return Ok(format(&parse(explicit)?));
    }
    match (options.is_new, options.latest) {
        (true, _) | (false, None) => Ok(INITIAL_VERSION.to_string()),
        (false, Some(latest)) => bump(latest, options.bump.unwrap_or_default()),
    }
}

/// The version number that follows the latest recorded one.
pub fn next_version_number(latest: Option<u64>) -> u64 {
    latest.map_or(1, |n| n + 1)
}
