//! Reconciliation engine
//!
//! Compares the versions declared in the main branch's CHANGES file with the
//! release branches, tags and hosted releases that exist, works out where in
//! history each missing artifact belongs, and creates them.
//!
//! The engine talks to the outside world only through the injected
//! [VersionControl] and [HostedRepository] collaborators.

pub mod apply;
pub mod backfill;

pub use apply::ApplyReport;
pub use backfill::{backfill, BackfillPlan, BackfillReport, CancellationToken, PlannedRef};

use crate::changes::{ChangeLog, Finding};
use crate::config::Config;
use crate::domain::{infer_style, BranchContext, Style, Version, VersionSet};
use crate::error::{ReleaseError, Result};
use crate::git::VersionControl;
use crate::host::{HostedRepository, RefInfo, ReleaseInfo};
use git2::Oid;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Branch used when neither the configuration nor the host names one
const FALLBACK_MAIN_BRANCH: &str = "main";

/// Released versions that lack an artifact, per artifact kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingArtifacts {
    pub branches: VersionSet,
    pub tags: VersionSet,
    pub releases: VersionSet,
}

impl MissingArtifacts {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.tags.is_empty() && self.releases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.branches.len() + self.tags.len() + self.releases.len()
    }
}

/// Compute which artifacts are missing for the `declared` versions.
///
/// Existing tag and release names are read back into versions with
/// `style.parse_version`, so `v2.1` counts as the tag of `2.1.0`; names that
/// do not parse are ignored. A version's branch is the release branch of its
/// major line (`style.branch_name`). Flavored versions are never released
/// and so are never missing anything. Pass `releases: None` when the host
/// keeps no release records.
pub fn compute_missing(
    declared: &VersionSet,
    style: &Style,
    branches: &[String],
    tags: &[String],
    releases: Option<&[String]>,
) -> MissingArtifacts {
    let branch_names: BTreeSet<&str> = branches.iter().map(String::as_str).collect();
    let tagged = parsed_versions(style, tags);
    let released = releases.map(|names| parsed_versions(style, names));

    let mut missing = MissingArtifacts::default();
    for version in declared.iter().filter(|v| !v.is_flavored()) {
        if !branch_names.contains(style.branch_name(version).as_str()) {
            missing.branches.insert(version.clone());
        }
        if !tagged.contains(version) {
            missing.tags.insert(version.clone());
        }
        if let Some(released) = &released {
            if !released.contains(version) {
                missing.releases.insert(version.clone());
            }
        }
    }
    missing
}

fn parsed_versions(style: &Style, names: &[String]) -> VersionSet {
    names
        .iter()
        .filter_map(|name| {
            let version = style.parse_version(name);
            if version.is_none() {
                debug!(name = %name, "Ignoring name that is not a version in this style");
            }
            version
        })
        .collect()
}

/// Snapshot of everything the engine knows about a repository
#[derive(Debug, Clone)]
pub struct Inventory {
    pub main_branch: String,
    pub main_head: Oid,
    /// Repository-relative path of the CHANGES file on the main branch
    pub changes_path: String,
    pub changes: ChangeLog,
    pub branches: Vec<RefInfo>,
    pub tags: Vec<RefInfo>,
    pub releases: Vec<ReleaseInfo>,
    /// Naming convention for new artifacts
    pub style: Style,
    /// Whether hosted releases are part of the reconciliation
    pub track_releases: bool,
}

impl Inventory {
    pub fn branch_names(&self) -> Vec<String> {
        self.branches.iter().map(|b| b.name.clone()).collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    /// Names under which each release is known: its title and its tag
    pub fn release_names(&self) -> Vec<String> {
        self.releases
            .iter()
            .flat_map(|r| [r.name.clone(), r.tag.clone()])
            .collect()
    }

    /// Existing tags that read as a version in the inventory's style
    pub fn version_tags(&self) -> BTreeMap<Version, (String, Oid)> {
        self.tags
            .iter()
            .filter_map(|t| {
                let version = self.style.parse_version(&t.name)?;
                Some((version, (t.name.clone(), t.target)))
            })
            .collect()
    }
}

/// Missing artifacts together with where to create them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub missing: MissingArtifacts,
    pub backfill: BackfillReport,
}

/// Validation findings for one branch's CHANGES file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFindings {
    pub branch: String,
    pub findings: Vec<Finding>,
}

impl fmt::Display for BranchFindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "Branch '{}': {}", self.branch, finding)?;
        }
        Ok(())
    }
}

/// Reconciles one repository through its collaborators
pub struct Reconciler<'a, V: ?Sized, H: ?Sized> {
    vcs: &'a V,
    host: &'a H,
    config: Config,
}

impl<'a, V, H> Reconciler<'a, V, H>
where
    V: VersionControl + ?Sized,
    H: HostedRepository + ?Sized,
{
    pub fn new(vcs: &'a V, host: &'a H, config: Config) -> Self {
        Reconciler { vcs, host, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gather branches, tags, releases and the main branch's CHANGES file,
    /// and settle on a naming style.
    ///
    /// # Errors
    /// Fails if the host cannot be queried, or if the main branch has no
    /// readable CHANGES file.
    pub fn inventory(&self) -> Result<Inventory> {
        let main_branch = match &self.config.repository.main_branch {
            Some(name) => name.clone(),
            None => self.host.default_branch().unwrap_or_else(|e| {
                warn!(error = %e, "Cannot determine default branch, assuming '{}'", FALLBACK_MAIN_BRANCH);
                FALLBACK_MAIN_BRANCH.to_string()
            }),
        };

        let branches = self.host.list_branches()?;
        let tags = self.host.list_tags()?;
        let track_releases = self.config.reconcile.track_releases && self.host.supports_releases();
        let releases = if track_releases {
            self.host.list_releases()?
        } else {
            Vec::new()
        };

        let main_head = match branches.iter().find(|b| b.name == main_branch) {
            Some(branch) => branch.target,
            None => self.vcs.head_commit(&main_branch)?,
        };
        let (changes_path, changes) = self.changes_at(main_head)?.ok_or_else(|| {
            ReleaseError::not_found(format!(
                "no CHANGES file ({}) on branch '{}'",
                self.config.changes.file_names.join(", "),
                main_branch
            ))
        })?;

        let names = branches
            .iter()
            .map(|b| b.name.as_str())
            .chain(tags.iter().map(|t| t.name.as_str()))
            .chain(releases.iter().map(|r| r.name.as_str()));
        let style = self.config.style.apply(infer_style(names));

        info!(
            main_branch = %main_branch,
            branches = branches.len(),
            tags = tags.len(),
            releases = releases.len(),
            prefix = %style.prefix,
            "Collected repository inventory"
        );

        Ok(Inventory {
            main_branch,
            main_head,
            changes_path,
            changes,
            branches,
            tags,
            releases,
            style,
            track_releases,
        })
    }

    /// Released versions on the main branch that lack a branch, tag or
    /// release.
    ///
    /// # Errors
    /// Returns [ReleaseError::UnsupportedOrder] for a CHANGES file written
    /// oldest first.
    pub fn missing(&self, inventory: &Inventory) -> Result<MissingArtifacts> {
        inventory.changes.ensure_newest_first()?;

        let releases = inventory.release_names();
        let missing = compute_missing(
            &inventory.changes.released_versions(),
            &inventory.style,
            &inventory.branch_names(),
            &inventory.tag_names(),
            inventory.track_releases.then_some(releases.as_slice()),
        );
        info!(
            branches = missing.branches.len(),
            tags = missing.tags.len(),
            releases = missing.releases.len(),
            "Computed missing artifacts"
        );
        Ok(missing)
    }

    /// Compute what is missing and scan history for where it belongs
    pub fn plan(&self, inventory: &Inventory, cancel: &CancellationToken) -> Result<ReconcilePlan> {
        let missing = self.missing(inventory)?;
        let backfill = if missing.branches.is_empty() && missing.tags.is_empty() {
            BackfillReport::default()
        } else {
            backfill(
                self.vcs,
                &inventory.changes_path,
                &inventory.main_head.to_string(),
                &missing,
                cancel,
            )?
        };
        Ok(ReconcilePlan { missing, backfill })
    }

    /// Validate the CHANGES file on every branch that has one.
    ///
    /// The main branch is checked as the development branch; release
    /// branches are also checked for notes of later major versions. Only
    /// branches with findings are returned. A branch whose CHANGES file
    /// cannot be read is reported as [Finding::Unreadable] and the remaining
    /// branches are still checked.
    pub fn validate_branches(&self, inventory: &Inventory) -> Vec<BranchFindings> {
        let mut out = Vec::new();
        for branch in &inventory.branches {
            let context = BranchContext::new(branch.name.as_str(), &inventory.main_branch);
            let doc = match self.changes_at(branch.target) {
                Ok(Some((_, doc))) => doc,
                Ok(None) => {
                    debug!(branch = %branch.name, "No CHANGES file on branch");
                    continue;
                }
                Err(e) => {
                    warn!(branch = %branch.name, error = %e, "Cannot read CHANGES file on branch");
                    out.push(BranchFindings {
                        branch: branch.name.clone(),
                        findings: vec![Finding::Unreadable {
                            reason: e.to_string(),
                        }],
                    });
                    continue;
                }
            };

            let mut findings = doc.validate(context.is_main);
            if let Some(major) = context.release_major {
                findings.extend(doc.validate_release_branch(major));
            }
            if !findings.is_empty() {
                out.push(BranchFindings {
                    branch: branch.name.clone(),
                    findings,
                });
            }
        }
        out
    }

    /// Read the CHANGES file at `commit`, trying each configured name.
    ///
    /// Returns `None` if no configured file exists at that commit.
    fn changes_at(&self, commit: Oid) -> Result<Option<(String, ChangeLog)>> {
        for name in &self.config.changes.file_names {
            let bytes = match self.vcs.show_file_at_revision(name, commit) {
                Ok(bytes) => bytes,
                Err(ReleaseError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let text = String::from_utf8(bytes)
                .map_err(|e| ReleaseError::format(name.as_str(), e.to_string()))?;
            return Ok(Some((name.clone(), ChangeLog::read(&text)?)));
        }
        Ok(None)
    }

    /// Release notes for `version` from the CHANGES file at `commit`
    fn notes_at(&self, commit: Oid, version: &Version) -> Result<String> {
        let (_, doc) = self.changes_at(commit)?.ok_or_else(|| {
            ReleaseError::not_found(format!("no CHANGES file at {}", commit))
        })?;
        doc.release_notes(version).ok_or_else(|| {
            ReleaseError::not_found(format!("release notes for version {}", version))
        })
    }
}
