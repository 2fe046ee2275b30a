use super::ChangeLog;
use crate::domain::{FlavorOrdering, Version};
use std::collections::BTreeSet;
use std::fmt;

/// A structural problem found in a CHANGES document.
///
/// Findings never abort validation; all of them are collected and returned
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The document declares no versions at all
    NoVersions,
    /// The development branch's topmost version should carry a flavor
    TopNotFlavored { version: Version, line: usize },
    /// Only the topmost version may be flavored
    IllegalFlavor { version: Version, line: usize },
    /// A version is not strictly greater than the one below it
    NotDescending {
        newer: Version,
        newer_line: usize,
        older: Version,
        older_line: usize,
    },
    /// A release branch documents a version from a later major line
    FutureVersion {
        version: Version,
        line: usize,
        branch_major: u32,
    },
    /// The document could not be read or parsed at all
    Unreadable { reason: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::NoVersions => write!(f, "CHANGES file does not contain any versions"),
            Finding::TopNotFlavored { version, line } => write!(
                f,
                "Top-most version {} on line {} is not suffixed with a flavor (e.g. -dev)",
                version, line
            ),
            Finding::IllegalFlavor { version, line } => write!(
                f,
                "Version {} on line {} is flavored. Only the current version can be flavored",
                version, line
            ),
            Finding::NotDescending {
                newer,
                newer_line,
                older,
                older_line,
            } => write!(
                f,
                "Version {} on line {} is not greater than version {} on line {}",
                newer, newer_line, older, older_line
            ),
            Finding::FutureVersion {
                version,
                line,
                branch_major,
            } => write!(
                f,
                "CHANGES in release branch {}.x.x has notes for future version {} on line {}",
                branch_major, version, line
            ),
            Finding::Unreadable { reason } => write!(f, "CHANGES file cannot be read: {}", reason),
        }
    }
}

impl ChangeLog {
    /// Check the document is well formed.
    ///
    /// `is_development` marks the document as belonging to the branch where
    /// new work lands, whose topmost version must be flavored.
    pub fn validate(&self, is_development: bool) -> Vec<Finding> {
        let entries = self.entries();
        let Some(top) = entries.first() else {
            return vec![Finding::NoVersions];
        };

        let mut findings = Vec::new();

        if is_development && !top.version.is_flavored() {
            findings.push(Finding::TopNotFlavored {
                version: top.version.clone(),
                line: top.line,
            });
        }

        // Oldest to newest; each entry is checked against the one above it.
        for i in (1..entries.len()).rev() {
            let older = &entries[i];
            let newer = &entries[i - 1];

            if older.version.is_flavored() {
                findings.push(Finding::IllegalFlavor {
                    version: older.version.clone(),
                    line: older.line,
                });
            }
            if !newer.version.greater_than(&older.version, FlavorOrdering::Aware) {
                findings.push(Finding::NotDescending {
                    newer: newer.version.clone(),
                    newer_line: newer.line,
                    older: older.version.clone(),
                    older_line: older.line,
                });
            }
        }

        findings
    }

    /// Check the document of a release branch maintaining `branch_major`.
    ///
    /// Reports each later major line documented on the branch once.
    pub fn validate_release_branch(&self, branch_major: u32) -> Vec<Finding> {
        let mut reported = BTreeSet::new();
        self.entries()
            .iter()
            .filter(|e| e.version.major > branch_major && reported.insert(e.version.major))
            .map(|e| Finding::FutureVersion {
                version: e.version.clone(),
                line: e.line,
                branch_major,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> ChangeLog {
        ChangeLog::read(text).unwrap()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_no_versions_is_terminal() {
        assert_eq!(read("just prose").validate(true), vec![Finding::NoVersions]);
    }

    #[test]
    fn test_well_formed_document() {
        let doc = read("## 2.1.0-dev\n\n## 2.0.0\n\n## 1.9.0\n\n## 1.0.0\n");
        assert!(doc.validate(true).is_empty());
        assert!(read("## 2.0.0\n## 1.0.0").validate(false).is_empty());
    }

    #[test]
    fn test_development_top_must_be_flavored() {
        let doc = read("## 2.0.0\n## 1.0.0\n");
        assert_eq!(
            doc.validate(true),
            vec![Finding::TopNotFlavored {
                version: v("2.0.0"),
                line: 1
            }]
        );
        assert!(doc.validate(false).is_empty());
    }

    #[test]
    fn test_adjacent_duplicates_reported_once() {
        let doc = read("## 2.0.0\n\n## 1.0.0\n\n## 1.0.0\n");
        let findings = doc.validate(false);
        assert_eq!(
            findings,
            vec![Finding::NotDescending {
                newer: v("1.0.0"),
                newer_line: 3,
                older: v("1.0.0"),
                older_line: 5,
            }]
        );
        let msg = findings[0].to_string();
        assert!(msg.contains("line 3") && msg.contains("line 5"), "got: {}", msg);
    }

    #[test]
    fn test_flavored_below_top_is_illegal() {
        let doc = read("## 3.0.0-dev\n## 2.0.0-rc\n## 1.0.0-beta\n## 0.1.0\n");
        let findings = doc.validate(true);
        assert_eq!(
            findings,
            vec![
                Finding::IllegalFlavor {
                    version: v("1.0.0-beta"),
                    line: 3
                },
                Finding::IllegalFlavor {
                    version: v("2.0.0-rc"),
                    line: 2
                },
            ]
        );
    }

    #[test]
    fn test_release_below_its_own_dev_version() {
        // 2.0.0-dev sorts below 2.0.0, so the order is wrong.
        let doc = read("## 2.0.0-dev\n## 2.0.0\n");
        assert_eq!(
            doc.validate(true),
            vec![Finding::NotDescending {
                newer: v("2.0.0-dev"),
                newer_line: 1,
                older: v("2.0.0"),
                older_line: 2,
            }]
        );
    }

    #[test]
    fn test_findings_accumulate() {
        let doc = read("## 1.0.0\n## 2.0.0-dev\n## 3.0.0\n");
        let findings = doc.validate(true);
        assert_eq!(findings.len(), 4);
        assert!(matches!(findings[0], Finding::TopNotFlavored { .. }));
    }

    #[test]
    fn test_release_branch_future_versions() {
        let doc = read("## 3.1.0\n## 3.0.0\n## 2.1.0\n## 2.0.0\n## 1.0.0\n");
        assert_eq!(
            doc.validate_release_branch(2),
            vec![Finding::FutureVersion {
                version: v("3.1.0"),
                line: 1,
                branch_major: 2
            }]
        );
        assert!(doc.validate_release_branch(3).is_empty());
        assert_eq!(doc.validate_release_branch(1).len(), 2);
    }
}
