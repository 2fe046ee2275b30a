//! Historical backfill scan
//!
//! Replays the history of the CHANGES file on the main branch, oldest commit
//! first, and assigns every missing version the earliest commit whose copy
//! of the document declares it.

use super::MissingArtifacts;
use crate::changes::ChangeLog;
use crate::domain::{Version, VersionSet};
use crate::error::Result;
use crate::git::VersionControl;
use crate::issues::{ArtifactKind, ScanIssue};
use git2::Oid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared between a scan and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A version and the commit its artifact should point at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRef {
    pub version: Version,
    pub commit: Oid,
}

/// Where each missing branch and tag should be created, in ascending
/// historical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillPlan {
    pub branches: Vec<PlannedRef>,
    pub tags: Vec<PlannedRef>,
}

impl BackfillPlan {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.tags.is_empty()
    }

    /// Commit planned for `version`'s tag, if any
    pub fn tag_commit(&self, version: &Version) -> Option<Oid> {
        self.tags
            .iter()
            .find(|planned| &planned.version == version)
            .map(|planned| planned.commit)
    }
}

/// Outcome of a backfill scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillReport {
    pub plan: BackfillPlan,
    pub issues: Vec<ScanIssue>,
    pub commits_scanned: usize,
    /// The scan stopped early; `plan` holds only what was found so far
    pub cancelled: bool,
}

/// Scan the history of `path` reachable from `from_ref` and plan every
/// branch and tag in `missing`.
///
/// Failing to list history is an error. A commit whose document cannot be
/// read or parsed is recorded as [ScanIssue::HistoricalParse] and skipped.
/// Versions that no commit declares are reported as
/// [ScanIssue::UnresolvedVersion] once the whole history has been scanned.
pub fn backfill<V: VersionControl + ?Sized>(
    vcs: &V,
    path: &str,
    from_ref: &str,
    missing: &MissingArtifacts,
    cancel: &CancellationToken,
) -> Result<BackfillReport> {
    let mut history = vcs.log(path, from_ref, None)?;
    history.reverse();

    let mut unresolved_branches = missing.branches.clone();
    let mut unresolved_tags = missing.tags.clone();
    let mut report = BackfillReport::default();

    for commit in &history {
        if unresolved_branches.is_empty() && unresolved_tags.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            info!(scanned = report.commits_scanned, "Backfill scan cancelled");
            report.cancelled = true;
            return Ok(report);
        }
        report.commits_scanned += 1;

        let declared = match declared_at(vcs, path, commit.id) {
            Ok(declared) => declared,
            Err(reason) => {
                warn!(commit = %commit.id, %reason, "Skipping unreadable CHANGES file");
                report.issues.push(ScanIssue::HistoricalParse {
                    commit: commit.id,
                    reason,
                });
                continue;
            }
        };
        debug!(commit = %commit.id, versions = declared.len(), "Scanned commit");

        claim(&declared, &mut unresolved_branches, commit.id, &mut report.plan.branches);
        claim(&declared, &mut unresolved_tags, commit.id, &mut report.plan.tags);
    }

    for (kind, unresolved) in [
        (ArtifactKind::Branch, unresolved_branches),
        (ArtifactKind::Tag, unresolved_tags),
    ] {
        for version in unresolved {
            warn!(%version, %kind, "Version never declared in history");
            report
                .issues
                .push(ScanIssue::UnresolvedVersion { kind, version });
        }
    }

    info!(
        branches = report.plan.branches.len(),
        tags = report.plan.tags.len(),
        issues = report.issues.len(),
        "Backfill scan finished"
    );
    Ok(report)
}

/// Unflavored versions declared by the document at `commit`
fn declared_at<V: VersionControl + ?Sized>(
    vcs: &V,
    path: &str,
    commit: Oid,
) -> std::result::Result<VersionSet, String> {
    let bytes = vcs
        .show_file_at_revision(path, commit)
        .map_err(|e| e.to_string())?;
    let text = String::from_utf8(bytes).map_err(|e| e.to_string())?;
    let doc = ChangeLog::read(&text).map_err(|e| e.to_string())?;
    Ok(doc.released_versions())
}

/// Move every unresolved version that `declared` contains into `plan`
fn claim(
    declared: &VersionSet,
    unresolved: &mut VersionSet,
    commit: Oid,
    plan: &mut Vec<PlannedRef>,
) {
    let found: Vec<Version> = unresolved.intersection(declared).cloned().collect();
    for version in found {
        unresolved.remove(&version);
        plan.push(PlannedRef { version, commit });
    }
}
