use super::{Inventory, ReconcilePlan, Reconciler};
use crate::domain::Version;
use crate::git::{branch_ref, tag_ref, VersionControl};
use crate::host::{HostedRepository, NewRelease};
use crate::issues::{ArtifactKind, ScanIssue};
use git2::Oid;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// What applying a plan achieved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub branches_created: usize,
    pub tags_created: usize,
    pub releases_created: usize,
    pub issues: Vec<ScanIssue>,
}

impl ApplyReport {
    pub fn created(&self) -> usize {
        self.branches_created + self.tags_created + self.releases_created
    }

    fn failed(&mut self, kind: ArtifactKind, name: &str, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(%kind, artifact = name, %reason, "Failed to create artifact");
        self.issues.push(ScanIssue::CreateFailed {
            kind,
            name: name.to_string(),
            reason,
        });
    }
}

impl<'a, V, H> Reconciler<'a, V, H>
where
    V: VersionControl + ?Sized,
    H: HostedRepository + ?Sized,
{
    /// Create the branches, tags and releases described by `plan`.
    ///
    /// Branches and tags are created in ascending historical order, so a
    /// release branch that several versions map to ends up at the newest of
    /// them. Releases use the notes recorded in the CHANGES file at their
    /// tag. Failures do not stop the batch; each is recorded in the report.
    pub fn apply(&self, inventory: &Inventory, plan: &ReconcilePlan, push: bool) -> ApplyReport {
        let mut report = ApplyReport::default();
        let remote = &self.config.repository.remote;

        for planned in &plan.backfill.plan.branches {
            let name = inventory.style.branch_name(&planned.version);
            match self.create_ref(&branch_ref(&name), planned.commit, push.then_some(remote)) {
                Ok(()) => {
                    info!(branch = %name, version = %planned.version, commit = %planned.commit, "Created release branch");
                    report.branches_created += 1;
                }
                Err(e) => report.failed(ArtifactKind::Branch, &name, e),
            }
        }

        let mut tag_targets: BTreeMap<Version, (String, Oid)> = inventory.version_tags();
        for planned in &plan.backfill.plan.tags {
            let name = inventory.style.format(&planned.version);
            match self.create_ref(&tag_ref(&name), planned.commit, push.then_some(remote)) {
                Ok(()) => {
                    info!(tag = %name, commit = %planned.commit, "Created release tag");
                    tag_targets.insert(planned.version.clone(), (name, planned.commit));
                    report.tags_created += 1;
                }
                Err(e) => report.failed(ArtifactKind::Tag, &name, e),
            }
        }

        if inventory.track_releases {
            for version in &plan.missing.releases {
                let name = inventory.style.format(version);
                let Some((tag, target)) = tag_targets.get(version).cloned() else {
                    report.failed(
                        ArtifactKind::Release,
                        &name,
                        format!("release tag '{}' does not exist", name),
                    );
                    continue;
                };
                let body = match self.notes_at(target, version) {
                    Ok(body) => body,
                    Err(e) => {
                        report.failed(ArtifactKind::Release, &name, e);
                        continue;
                    }
                };
                let release = NewRelease {
                    name: name.clone(),
                    tag,
                    target,
                    body,
                };
                match self.host.create_release(&release) {
                    Ok(()) => {
                        info!(release = %name, "Created release");
                        report.releases_created += 1;
                    }
                    Err(e) => report.failed(ArtifactKind::Release, &name, e),
                }
            }
        }

        report
    }

    fn create_ref(&self, full_name: &str, target: Oid, remote: Option<&String>) -> crate::Result<()> {
        self.vcs.create_or_update_ref(full_name, target)?;
        if let Some(remote) = remote {
            self.vcs
                .push(remote, &format!("+{0}:{0}", full_name))?;
        }
        Ok(())
    }
}
