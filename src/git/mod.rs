//! Version control abstraction layer
//!
//! This module provides a trait-based abstraction over the version control
//! operations release-sync needs, so the reconciliation engine can run
//! against a real repository or an in-memory history in tests.
//!
//! # Overview
//!
//! The primary abstraction is the [VersionControl] trait. The concrete
//! implementations are:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory history for testing
//!
//! Commits are identified by [git2::Oid]; only their identity and the order
//! in which [VersionControl::log] returns them matter to the engine.
//!
//! # Usage
//!
//! ```rust
//! # use release_sync::git::VersionControl;
//! # fn example<V: VersionControl>(vcs: &V) -> release_sync::Result<()> {
//! let history = vcs.log("CHANGES.md", "main", None)?;
//! for commit in history.iter().rev() {
//!     let content = vcs.show_file_at_revision("CHANGES.md", commit.id)?;
//!     println!("{}: {} bytes", commit.id, content.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use git2::Oid;

/// Commit information returned by [VersionControl::log]
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Full commit hash
    pub id: Oid,
    /// Committer timestamp
    pub timestamp: DateTime<FixedOffset>,
    /// `Name <email>` of the author
    pub author: String,
    /// First line of the commit message
    pub subject: String,
    /// Remainder of the commit message, trimmed
    pub body: String,
}

/// Full name of the branch reference for `branch`
pub fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{}", branch)
}

/// Full name of the tag reference for `tag`
pub fn tag_ref(tag: &str) -> String {
    format!("refs/tags/{}", tag)
}

/// Version control operations used by the reconciliation engine
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` so independent working copies can
/// be processed from different threads.
///
/// ## Error Handling
///
/// Implementations map their underlying errors to
/// [crate::error::ReleaseError] variants (`Git` for `git2` failures, `Vcs`
/// for everything else).
pub trait VersionControl: Send + Sync {
    /// History of `path` reachable from `from_ref`, newest first.
    ///
    /// Only commits that change `path` are returned. `count` limits the
    /// number of commits; `None` returns the full history.
    fn log(&self, path: &str, from_ref: &str, count: Option<usize>) -> Result<Vec<CommitInfo>>;

    /// Raw content of `path` as of `commit`
    fn show_file_at_revision(&self, path: &str, commit: Oid) -> Result<Vec<u8>>;

    /// Commit a reference (branch, tag or revision expression) resolves to
    fn head_commit(&self, reference: &str) -> Result<Oid>;

    /// Point the full reference `name` (e.g. `refs/tags/v1.0.0`) at `target`,
    /// creating it if needed
    fn create_or_update_ref(&self, name: &str, target: Oid) -> Result<()>;

    /// Push `refspec` to `remote`
    fn push(&self, remote: &str, refspec: &str) -> Result<()>;
}
