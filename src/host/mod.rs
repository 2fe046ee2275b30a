//! Hosted repository abstraction
//!
//! The hosting service owns the authoritative list of branches, tags and
//! release records. [HostedRepository] exposes the handful of calls the
//! reconciliation engine needs; [memory::InMemoryHost] backs tests and
//! [crate::git::Git2Repository] serves a local clone.

pub mod memory;

pub use memory::InMemoryHost;

use crate::error::Result;
use git2::Oid;

/// A named reference (branch or tag) and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefInfo {
    pub name: String,
    pub target: Oid,
}

impl RefInfo {
    pub fn new(name: impl Into<String>, target: Oid) -> Self {
        RefInfo {
            name: name.into(),
            target,
        }
    }
}

/// An existing release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub name: String,
    pub tag: String,
}

/// Parameters for creating a release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub name: String,
    pub tag: String,
    pub target: Oid,
    /// Release notes
    pub body: String,
}

/// Operations on the hosted copy of the repository
pub trait HostedRepository: Send + Sync {
    /// Name of the default (development) branch
    fn default_branch(&self) -> Result<String>;

    fn list_branches(&self) -> Result<Vec<RefInfo>>;

    fn list_tags(&self) -> Result<Vec<RefInfo>>;

    fn list_releases(&self) -> Result<Vec<ReleaseInfo>>;

    /// Whether this host keeps release records at all; hosts that do not
    /// are never asked for missing releases
    fn supports_releases(&self) -> bool {
        true
    }

    fn create_release(&self, release: &NewRelease) -> Result<()>;
}
