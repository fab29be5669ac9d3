//! tmux version detection.
//!
//! tmux versions are `MAJOR.MINOR` with an optional letter suffix for
//! bug-fix releases (`3.2a`). They are mapped onto [`semver::Version`] with
//! the letter as the patch number (`3.2a` → `3.2.1`) so feature gates can use
//! ordinary comparisons. Development builds (`master`, `next-3.5`) and
//! OpenBSD base builds (`openbsd-7.4`) are treated as newer than any release
//! they could be compared against.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::TmuxError;

/// Version reported for development builds without a usable number.
const DEVELOPMENT_VERSION: Version = Version::new(99, 0, 0);

/// Parsed tmux version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TmuxVersion {
    version: Version,
    raw: String,
}

impl TmuxVersion {
    /// Build a version directly, mostly useful for tests and fakes.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        let version = Version::new(major, minor, patch);
        Self {
            raw: format!("{major}.{minor}"),
            version,
        }
    }

    /// The semver view of this version.
    pub fn semver(&self) -> &Version {
        &self.version
    }

    /// The string tmux printed (without the `tmux ` prefix).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `true` when this version is at least `minimum`.
    pub fn at_least(&self, minimum: &Version) -> bool {
        self.version >= *minimum
    }
}

impl fmt::Display for TmuxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for TmuxVersion {
    type Err = TmuxError;

    /// Parse the output of `tmux -V`, e.g. `tmux 3.3a`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TmuxError::InvalidVersion(s.to_string());
        let raw = s.trim();
        let raw = raw.strip_prefix("tmux").map(str::trim).unwrap_or(raw);
        if raw.is_empty() {
            return Err(invalid());
        }

        if raw == "master" || raw.starts_with("openbsd-") {
            return Ok(Self {
                version: DEVELOPMENT_VERSION,
                raw: raw.to_string(),
            });
        }

        let numeric = raw.strip_prefix("next-").unwrap_or(raw);
        let (major, rest) = numeric.split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u64>().map_err(|_| invalid())?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let minor = digits.parse::<u64>().map_err(|_| invalid())?;
        let suffix = &rest[digits.len()..];
        let patch = match suffix.chars().next() {
            None => 0,
            Some(c) if c.is_ascii_lowercase() => u64::from(c as u8 - b'a') + 1,
            // "-rc" and friends sort just below the release they precede
            Some('-') => 0,
            Some(_) => return Err(invalid()),
        };

        Ok(Self {
            version: Version::new(major, minor, patch),
            raw: raw.to_string(),
        })
    }
}
