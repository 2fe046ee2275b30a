use crate::error::{ReleaseError, Result};
use crate::git::{CommitInfo, VersionControl};
use crate::host::{HostedRepository, NewRelease, RefInfo, ReleaseInfo};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{BranchType, Commit, Oid, Repository as Git2Repo, Sort};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Wrapper around git2::Repository implementing [VersionControl]
///
/// It also serves branches and tags as a [HostedRepository] for working
/// against a local clone; a plain git repository has no release records.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Git2Repo) -> Result<T>) -> Result<T> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ReleaseError::vcs("repository lock poisoned"))?;
        f(&repo)
    }
}

fn commit_info(commit: &Commit<'_>) -> CommitInfo {
    let time = commit.time();
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or(Utc.fix());
    let timestamp: DateTime<FixedOffset> = DateTime::from_timestamp(time.seconds(), 0)
        .unwrap_or_default()
        .with_timezone(&offset);

    let author = commit.author();
    let message = commit.message().unwrap_or("");
    let (subject, body) = message.split_once('\n').unwrap_or((message, ""));

    CommitInfo {
        id: commit.id(),
        timestamp,
        author: format!(
            "{} <{}>",
            author.name().unwrap_or("unknown"),
            author.email().unwrap_or("")
        ),
        subject: subject.trim().to_string(),
        body: body.trim().to_string(),
    }
}

/// Blob id of `path` in `commit`'s tree, `None` when the path is absent
fn path_id(commit: &Commit<'_>, path: &Path) -> Result<Option<Oid>> {
    match commit.tree()?.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A commit touches `path` when its version of the path differs from every
/// parent's (or, for a root commit, when the path exists).
fn touches_path(commit: &Commit<'_>, path: &Path) -> Result<bool> {
    let own = path_id(commit, path)?;
    if commit.parent_count() == 0 {
        return Ok(own.is_some());
    }
    for parent in commit.parents() {
        if path_id(&parent, path)? == own {
            return Ok(false);
        }
    }
    Ok(true)
}

impl VersionControl for Git2Repository {
    fn log(&self, path: &str, from_ref: &str, count: Option<usize>) -> Result<Vec<CommitInfo>> {
        self.with_repo(|repo| {
            let start = repo.revparse_single(from_ref)?.peel_to_commit()?;
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
            revwalk.push(start.id())?;

            let path = Path::new(path);
            let limit = count.unwrap_or(usize::MAX);
            let mut commits = Vec::new();

            for oid_result in revwalk {
                if commits.len() >= limit {
                    break;
                }
                let commit = repo.find_commit(oid_result?)?;
                if touches_path(&commit, path)? {
                    commits.push(commit_info(&commit));
                }
            }

            debug!(path = %path.display(), from_ref, commits = commits.len(), "read history");
            Ok(commits)
        })
    }

    fn show_file_at_revision(&self, path: &str, commit: Oid) -> Result<Vec<u8>> {
        self.with_repo(|repo| {
            let tree = repo.find_commit(commit)?.tree()?;
            let entry = tree.get_path(Path::new(path)).map_err(|e| {
                ReleaseError::not_found(format!("'{}' at {}: {}", path, commit, e.message()))
            })?;
            let blob = entry.to_object(repo)?.peel_to_blob()?;
            Ok(blob.content().to_vec())
        })
    }

    fn head_commit(&self, reference: &str) -> Result<Oid> {
        self.with_repo(|repo| {
            let commit = repo.revparse_single(reference)?.peel_to_commit()?;
            Ok(commit.id())
        })
    }

    fn create_or_update_ref(&self, name: &str, target: Oid) -> Result<()> {
        self.with_repo(|repo| {
            repo.find_commit(target).map_err(|e| {
                ReleaseError::vcs(format!("Cannot point '{}' at {}: {}", name, target, e))
            })?;
            repo.reference(name, target, true, "release-sync: backfill release reference")?;
            Ok(())
        })
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.with_repo(|repo| {
            let mut remote = repo
                .find_remote(remote)
                .map_err(|e| ReleaseError::vcs(format!("Cannot find remote: {}", e)))?;

            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.credentials(|_url, username_from_url, allowed_types| {
                if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                    if let Ok(cred) =
                        git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
                    {
                        return Ok(cred);
                    }
                }
                git2::Cred::default()
            });
            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);

            remote
                .push(&[refspec], Some(&mut options))
                .map_err(|e| ReleaseError::vcs(format!("Push of '{}' failed: {}", refspec, e)))?;

            Ok(())
        })
    }
}

impl HostedRepository for Git2Repository {
    fn default_branch(&self) -> Result<String> {
        self.with_repo(|repo| {
            let head = repo.head()?;
            head.shorthand()
                .map(str::to_string)
                .ok_or_else(|| ReleaseError::vcs("HEAD is not a valid UTF-8 reference"))
        })
    }

    fn list_branches(&self) -> Result<Vec<RefInfo>> {
        self.with_repo(|repo| {
            let mut out = Vec::new();
            for branch in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = branch?;
                let (Some(name), Some(target)) = (branch.name()?, branch.get().target()) else {
                    continue;
                };
                out.push(RefInfo::new(name, target));
            }
            Ok(out)
        })
    }

    fn list_tags(&self) -> Result<Vec<RefInfo>> {
        self.with_repo(|repo| {
            let mut out = Vec::new();
            for name in repo.tag_names(None)?.iter().flatten() {
                let target = repo
                    .find_reference(&crate::git::tag_ref(name))?
                    .peel_to_commit()?
                    .id();
                out.push(RefInfo::new(name, target));
            }
            Ok(out)
        })
    }

    fn list_releases(&self) -> Result<Vec<ReleaseInfo>> {
        Ok(Vec::new())
    }

    fn supports_releases(&self) -> bool {
        false
    }

    fn create_release(&self, release: &NewRelease) -> Result<()> {
        Err(ReleaseError::host(format!(
            "cannot create release '{}': a local git repository has no release records",
            release.name
        )))
    }
}
