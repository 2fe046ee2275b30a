//! Naming conventions for release branches, tags and releases.
//!
//! A [`Style`] captures the literal prefix in front of the version digits and
//! whether a zero patch digit is dropped, so that `v2.3`, `release-1.0.0` and
//! `2.1.0-dev` can all be rendered and read back consistently.

use crate::domain::version::{tokenize, Version};
use std::collections::BTreeMap;
use tracing::debug;

/// Prefix used when no existing name reveals the project's convention
pub const DEFAULT_PREFIX: &str = "release-";

/// Version naming convention
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Literal text before the digits, e.g. `"v"` or `"release-"`
    pub prefix: String,
    /// Drop the patch digit when it is zero
    pub omit_patch: bool,
}

impl Style {
    pub fn new(prefix: impl Into<String>, omit_patch: bool) -> Self {
        Style {
            prefix: prefix.into(),
            omit_patch,
        }
    }

    /// Read the style a single name was written in.
    ///
    /// Returns `None` if `name` is not a version identifier. The patch digit
    /// counts as omitted only when it is absent from `name`.
    pub fn parse(name: &str) -> Option<Style> {
        let token = tokenize(name)?;
        Some(Style::new(token.prefix, token.patch.is_none()))
    }

    /// Render `version` in this style.
    ///
    /// ```
    /// use release_sync::domain::{Style, Version};
    ///
    /// let style = Style::new("v", true);
    /// let version = Version::new(2, 3, 0).with_flavor("dev");
    /// assert_eq!(style.format(&version), "v2.3-dev");
    /// ```
    pub fn format(&self, version: &Version) -> String {
        let mut out = format!("{}{}.{}", self.prefix, version.major, version.minor);
        if version.patch != 0 || !self.omit_patch {
            out.push_str(&format!(".{}", version.patch));
        }
        if let Some(flavor) = version.flavor() {
            out.push('-');
            out.push_str(flavor);
        }
        out
    }

    /// Read a version back from a name written in this style.
    ///
    /// Names with a different prefix, or that are not versions at all, yield
    /// `None`.
    pub fn parse_version(&self, name: &str) -> Option<Version> {
        let token = tokenize(name)?;
        if token.prefix != self.prefix {
            return None;
        }
        Version::parse(name).ok()
    }

    /// Name of the release branch that carries every release of `version`'s
    /// major line, e.g. `release-2.x.x`
    pub fn branch_name(&self, version: &Version) -> String {
        if self.omit_patch {
            format!("{}{}.x", self.prefix, version.major)
        } else {
            format!("{}{}.x.x", self.prefix, version.major)
        }
    }
}

/// Merge two styles.
///
/// Styles with different prefixes cannot be merged. The merged style omits
/// the patch digit if either input does.
pub fn merge(a: &Style, b: &Style) -> Option<Style> {
    if a.prefix != b.prefix {
        return None;
    }
    Some(Style::new(a.prefix.clone(), a.omit_patch || b.omit_patch))
}

/// Infer the dominant naming convention from existing artifact names.
///
/// The most frequent prefix wins, ties going to the lexicographically
/// smallest. The patch digit is omitted only if every recognised name omits
/// it. With no recognisable names the result is `release-` with patch digits.
pub fn infer_style<I, S>(names: I) -> Style
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prefix_uses: BTreeMap<String, usize> = BTreeMap::new();
    let mut every_name_omits_patch = true;

    for name in names {
        if let Some(style) = Style::parse(name.as_ref()) {
            *prefix_uses.entry(style.prefix).or_insert(0) += 1;
            every_name_omits_patch &= style.omit_patch;
        }
    }

    // BTreeMap iterates prefixes in ascending order, so keeping only strictly
    // greater counts leaves the smallest prefix among equals.
    let mut chosen: Option<(&String, usize)> = None;
    for (prefix, &uses) in &prefix_uses {
        if chosen.map_or(true, |(_, best)| uses > best) {
            chosen = Some((prefix, uses));
        }
    }

    let style = match chosen {
        Some((prefix, _)) => Style::new(prefix.clone(), every_name_omits_patch),
        None => Style::new(DEFAULT_PREFIX, false),
    };
    debug!(
        prefix = %style.prefix,
        omit_patch = style.omit_patch,
        candidates = prefix_uses.len(),
        "inferred version style"
    );
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style() {
        assert_eq!(Style::parse("v2.3-dev"), Some(Style::new("v", true)));
        assert_eq!(Style::parse("release-1.2.3"), Some(Style::new("release-", false)));
        assert_eq!(Style::parse("1.2.3"), Some(Style::new("", false)));
        assert_eq!(Style::parse("main"), None);
    }

    #[test]
    fn test_round_trip_through_inferred_style() {
        for name in ["v2.3-dev", "release-1.0.0", "2.0", "v1.0.1", "rel-3.4.5-rc", "10.0.0"] {
            let version = Version::parse(name).unwrap();
            let style = Style::parse(name).unwrap();
            assert_eq!(style.format(&version), name);
        }
    }

    #[test]
    fn test_omit_patch_keeps_nonzero_patch() {
        let style = Style::new("v", true);
        assert_eq!(style.format(&Version::new(1, 2, 0)), "v1.2");
        assert_eq!(style.format(&Version::new(1, 2, 5)), "v1.2.5");
    }

    #[test]
    fn test_parse_version_requires_matching_prefix() {
        let style = Style::new("v", false);
        assert_eq!(style.parse_version("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(style.parse_version("release-1.2.3"), None);
        assert_eq!(style.parse_version("main"), None);
    }

    #[test]
    fn test_branch_name() {
        let version = Version::new(2, 1, 0);
        assert_eq!(Style::new("release-", false).branch_name(&version), "release-2.x.x");
        assert_eq!(Style::new("v", true).branch_name(&version), "v2.x");
    }

    #[test]
    fn test_merge() {
        let a = Style::new("v", false);
        let b = Style::new("v", true);
        assert_eq!(merge(&a, &b), Some(Style::new("v", true)));
        assert_eq!(merge(&a, &a), Some(a.clone()));
        assert_eq!(merge(&a, &Style::new("release-", false)), None);
    }

    #[test]
    fn test_infer_most_common_prefix() {
        let style = infer_style(["v1.0.0", "v1.1.0", "release-1.0.0", "main", "develop"]);
        assert_eq!(style, Style::new("v", false));
    }

    #[test]
    fn test_infer_tie_breaks_to_smallest_prefix() {
        let style = infer_style(["v1.0", "release-1.0", "v2.0", "release-2.0"]);
        assert_eq!(style, Style::new("release-", true));

        // Input order must not matter.
        let style = infer_style(["release-2.0", "v2.0", "release-1.0", "v1.0"]);
        assert_eq!(style, Style::new("release-", true));
    }

    #[test]
    fn test_infer_omit_patch_only_when_every_name_omits() {
        assert!(infer_style(["v1.0", "v2.0"]).omit_patch);
        assert!(!infer_style(["v1.0", "v2.0.0"]).omit_patch);
    }

    #[test]
    fn test_infer_default() {
        let empty: [&str; 0] = [];
        assert_eq!(infer_style(empty), Style::new(DEFAULT_PREFIX, false));
        assert_eq!(infer_style(["main", "gh-pages"]), Style::new("release-", false));
    }
}
