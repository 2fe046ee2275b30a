use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Unique versions, iterated oldest first
pub type VersionSet = BTreeSet<Version>;

/// How two versions that share major, minor and patch are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlavorOrdering {
    /// An unflavored version is greater than any flavored one; flavors
    /// tie-break lexicographically
    Aware,
    /// Flavors are ignored, so `2.0.0-dev` equals `2.0.0`
    Ignore,
}

/// Semantic version with an optional flavor suffix (e.g. `2.1.0-dev`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Never `Some("")`; constructors normalize empty flavors to `None`
    pub flavor: Option<String>,
}

/// Raw pieces of a version token, before numeric conversion
pub(crate) struct Token<'a> {
    pub prefix: &'a str,
    pub major: &'a str,
    pub minor: &'a str,
    pub patch: Option<&'a str>,
    pub flavor: Option<&'a str>,
}

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^(\w*-|v)?(\d+)\.(\d+)(?:\.(\d+))?(?:-(\w+))?$")
            .expect("version grammar is a valid regex")
    })
}

/// Split `s` into prefix, numeric parts and flavor.
///
/// Returns `None` when `s` does not match `[prefix]MAJOR.MINOR[.PATCH][-FLAVOR]`.
pub(crate) fn tokenize(s: &str) -> Option<Token<'_>> {
    let caps = grammar().captures(s)?;
    Some(Token {
        prefix: caps.get(1).map_or("", |m| m.as_str()),
        major: caps.get(2)?.as_str(),
        minor: caps.get(3)?.as_str(),
        patch: caps.get(4).map(|m| m.as_str()),
        flavor: caps.get(5).map(|m| m.as_str()),
    })
}

fn parse_component(input: &str, name: &str, digits: &str) -> Result<u32> {
    digits.parse::<u32>().map_err(|_| {
        ReleaseError::format(input, format!("{} component '{}' is out of range", name, digits))
    })
}

impl Version {
    /// Create an unflavored version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
            flavor: None,
        }
    }

    /// Return a copy of this version carrying `flavor` (an empty flavor clears it)
    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        let flavor = flavor.into();
        self.flavor = if flavor.is_empty() { None } else { Some(flavor) };
        self
    }

    /// Return a copy of this version with the flavor removed
    pub fn without_flavor(&self) -> Self {
        Version::new(self.major, self.minor, self.patch)
    }

    pub fn flavor(&self) -> Option<&str> {
        self.flavor.as_deref()
    }

    pub fn is_flavored(&self) -> bool {
        self.flavor.is_some()
    }

    /// Parse a version from text such as `v2.3-dev`, `release-1.2.3` or `1.0`.
    ///
    /// The optional prefix is discarded; use [`crate::domain::Style::parse`]
    /// to recover it. A missing patch digit defaults to 0.
    ///
    /// # Errors
    /// Returns [`ReleaseError::Format`] if `text` does not follow the
    /// `[prefix]MAJOR.MINOR[.PATCH][-FLAVOR]` grammar or a component
    /// overflows.
    pub fn parse(text: &str) -> Result<Self> {
        let token = tokenize(text).ok_or_else(|| {
            ReleaseError::format(text, "expected [prefix]MAJOR.MINOR[.PATCH][-FLAVOR]")
        })?;

        let major = parse_component(text, "major", token.major)?;
        let minor = parse_component(text, "minor", token.minor)?;
        let patch = match token.patch {
            Some(digits) => parse_component(text, "patch", digits)?,
            None => 0,
        };

        let version = Version::new(major, minor, patch);
        Ok(match token.flavor {
            Some(flavor) => version.with_flavor(flavor),
            None => version,
        })
    }

    /// Compare two versions under the given flavor ordering
    pub fn compare(&self, other: &Version, flavors: FlavorOrdering) -> Ordering {
        compare(self, other, flavors)
    }

    /// True if `self` is strictly greater than `other`
    pub fn greater_than(&self, other: &Version, flavors: FlavorOrdering) -> bool {
        compare(self, other, flavors) == Ordering::Greater
    }
}

/// Order `a` relative to `b`.
///
/// Major, minor and patch compare numerically. With [`FlavorOrdering::Aware`]
/// an unflavored version sorts after every flavored version of the same
/// number, and two flavors compare as strings.
pub fn compare(a: &Version, b: &Version, flavors: FlavorOrdering) -> Ordering {
    let numeric = (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch));
    if numeric != Ordering::Equal || flavors == FlavorOrdering::Ignore {
        return numeric;
    }
    match (a.flavor(), b.flavor()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

/// Sort versions from the most recent to the oldest
pub fn sort_newest_first(versions: &mut [Version]) {
    versions.sort_by(|a, b| compare(b, a, FlavorOrdering::Aware));
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other, FlavorOrdering::Aware)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(flavor) = self.flavor() {
            write!(f, "-{}", flavor)?;
        }
        Ok(())
    }
}
