use crate::domain::Version;
use git2::Oid;
use std::fmt;

/// The kinds of artifact expected for every released version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Branch,
    Tag,
    Release,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Branch => write!(f, "release branch"),
            ArtifactKind::Tag => write!(f, "release tag"),
            ArtifactKind::Release => write!(f, "release"),
        }
    }
}

/// Problems found while scanning history or creating artifacts.
/// These are non-fatal: the batch carries on and reports them together.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanIssue {
    /// The CHANGES file could not be read or parsed at a historical commit
    HistoricalParse { commit: Oid, reason: String },
    /// A missing version was never declared in any scanned commit
    UnresolvedVersion { kind: ArtifactKind, version: Version },
    /// Creating or pushing an artifact failed
    CreateFailed {
        kind: ArtifactKind,
        name: String,
        reason: String,
    },
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanIssue::HistoricalParse { commit, reason } => {
                let hash = commit.to_string();
                write!(f, "Skipped commit {}: {}", &hash[..hash.len().min(7)], reason)
            }
            ScanIssue::UnresolvedVersion { kind, version } => write!(
                f,
                "No commit declares version {}; cannot place its {}",
                version, kind
            ),
            ScanIssue::CreateFailed { kind, name, reason } => {
                write!(f, "Failed to create {} '{}': {}", kind, name, reason)
            }
        }
    }
}
