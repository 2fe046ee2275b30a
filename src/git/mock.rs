use crate::error::{ReleaseError, Result};
use crate::git::{CommitInfo, VersionControl};
use chrono::{DateTime, Duration};
use git2::Oid;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory, single-branch history for testing without a git repository
///
/// Every call to [MockRepository::commit_file] appends a commit that stores
/// the full content of one file; files not mentioned keep their previous
/// content.
pub struct MockRepository {
    /// Oldest first
    commits: Vec<CommitInfo>,
    /// Content of every file as of each commit
    snapshots: HashMap<Oid, BTreeMap<String, Vec<u8>>>,
    /// Files changed by each commit
    touched: HashMap<Oid, String>,
    unreadable: Vec<Oid>,
    refs: Mutex<BTreeMap<String, Oid>>,
    pushed: Mutex<Vec<(String, String)>>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            commits: Vec::new(),
            snapshots: HashMap::new(),
            touched: HashMap::new(),
            unreadable: Vec::new(),
            refs: Mutex::new(BTreeMap::new()),
            pushed: Mutex::new(Vec::new()),
        }
    }

    /// Id of the n-th commit (1-based)
    ///
    /// The full position is encoded in the last eight bytes, so ids stay
    /// unique however long the history grows.
    pub fn commit_id(n: usize) -> Oid {
        let mut bytes = [n as u8; 20];
        bytes[12..].copy_from_slice(&(n as u64).to_be_bytes());
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    /// Commit new content for `path`, returning [`MockRepository::commit_id`]
    /// of its position.
    pub fn commit_file(&mut self, path: &str, content: &str, subject: &str) -> Oid {
        let n = self.commits.len() + 1;
        let id = Self::commit_id(n);

        let mut files = self
            .commits
            .last()
            .and_then(|c| self.snapshots.get(&c.id))
            .cloned()
            .unwrap_or_default();
        files.insert(path.to_string(), content.as_bytes().to_vec());

        // 2020-01-01T00:00:00Z
        let epoch = DateTime::from_timestamp(1_577_836_800, 0)
            .unwrap_or_default()
            .fixed_offset();
        self.commits.push(CommitInfo {
            id,
            timestamp: epoch + Duration::days(n as i64),
            author: "Test Author <test@example.com>".to_string(),
            subject: subject.to_string(),
            body: String::new(),
        });
        self.snapshots.insert(id, files);
        self.touched.insert(id, path.to_string());
        self.refs().insert("refs/heads/main".to_string(), id);
        id
    }

    /// Make reading any file at `commit` fail
    pub fn make_unreadable(&mut self, commit: Oid) {
        self.unreadable.push(commit);
    }

    /// Point a reference at a commit without going through the trait
    pub fn set_ref(&self, name: impl Into<String>, target: Oid) {
        self.refs().insert(name.into(), target);
    }

    /// Current value of a full reference name
    pub fn ref_target(&self, name: &str) -> Option<Oid> {
        self.refs().get(name).copied()
    }

    /// Every `(remote, refspec)` pushed so far
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn refs(&self) -> MutexGuard<'_, BTreeMap<String, Oid>> {
        self.refs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, reference: &str) -> Option<Oid> {
        let refs = self.refs();
        if reference == "HEAD" {
            return self.commits.last().map(|c| c.id);
        }
        [
            reference.to_string(),
            crate::git::branch_ref(reference),
            crate::git::tag_ref(reference),
        ]
        .iter()
        .find_map(|name| refs.get(name).copied())
        .or_else(|| Oid::from_str(reference).ok().filter(|id| self.snapshots.contains_key(id)))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for MockRepository {
    fn log(&self, path: &str, from_ref: &str, count: Option<usize>) -> Result<Vec<CommitInfo>> {
        let start = self
            .resolve(from_ref)
            .ok_or_else(|| ReleaseError::vcs(format!("unknown revision '{}'", from_ref)))?;
        let end = self
            .commits
            .iter()
            .position(|c| c.id == start)
            .map_or(0, |i| i + 1);

        Ok(self.commits[..end]
            .iter()
            .rev()
            .filter(|c| self.touched.get(&c.id).is_some_and(|p| p == path))
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn show_file_at_revision(&self, path: &str, commit: Oid) -> Result<Vec<u8>> {
        if self.unreadable.contains(&commit) {
            return Err(ReleaseError::vcs(format!("object {} is corrupt", commit)));
        }
        self.snapshots
            .get(&commit)
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| ReleaseError::not_found(format!("'{}' at {}", path, commit)))
    }

    fn head_commit(&self, reference: &str) -> Result<Oid> {
        self.resolve(reference)
            .ok_or_else(|| ReleaseError::vcs(format!("unknown revision '{}'", reference)))
    }

    fn create_or_update_ref(&self, name: &str, target: Oid) -> Result<()> {
        if !self.snapshots.contains_key(&target) {
            return Err(ReleaseError::vcs(format!("unknown commit {}", target)));
        }
        self.set_ref(name, target);
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.pushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((remote.to_string(), refspec.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mock_repository_history() {
        let mut repo = MockRepository::new();
        let first = repo.commit_file("CHANGES", "## 1.0.0", "first");
        let second = repo.commit_file("README", "readme", "second");
        let third = repo.commit_file("CHANGES", "## 1.1.0\n## 1.0.0", "third");

        assert_eq!(first, MockRepository::commit_id(1));
        let ids: Vec<Oid> = repo
            .log("CHANGES", "main", None)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![third, first]);

        // Files carry over between commits.
        assert_eq!(
            repo.show_file_at_revision("CHANGES", second).unwrap(),
            b"## 1.0.0".to_vec()
        );
        assert!(repo.show_file_at_revision("README", first).is_err());
    }

    #[test]
    fn test_mock_repository_log_from_older_ref() {
        let mut repo = MockRepository::new();
        let first = repo.commit_file("CHANGES", "a", "first");
        repo.commit_file("CHANGES", "b", "second");
        repo.set_ref("refs/tags/v1", first);

        let log = repo.log("CHANGES", "v1", None).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, first);
        assert_eq!(repo.log("CHANGES", "HEAD", Some(1)).unwrap().len(), 1);
        assert!(repo.log("CHANGES", "nope", None).is_err());
    }

    #[test]
    fn test_mock_repository_refs() {
        let mut repo = MockRepository::new();
        let first = repo.commit_file("CHANGES", "a", "first");

        repo.create_or_update_ref("refs/tags/v1.0.0", first).unwrap();
        assert_eq!(repo.ref_target("refs/tags/v1.0.0"), Some(first));
        assert_eq!(repo.head_commit("v1.0.0").unwrap(), first);

        let unknown = Oid::from_bytes(&[9; 20]).unwrap();
        assert!(repo.create_or_update_ref("refs/tags/bad", unknown).is_err());

        repo.push("origin", "refs/tags/v1.0.0").unwrap();
        assert_eq!(
            repo.pushed(),
            vec![("origin".to_string(), "refs/tags/v1.0.0".to_string())]
        );
    }

    #[test]
    fn test_mock_repository_unreadable_commit() {
        let mut repo = MockRepository::new();
        let first = repo.commit_file("CHANGES", "a", "first");
        repo.make_unreadable(first);
        assert!(repo.show_file_at_revision("CHANGES", first).is_err());
    }

    #[test]
    fn test_commit_ids_stay_unique_in_long_histories() {
        let mut repo = MockRepository::new();
        let ids: HashSet<Oid> = (0..300)
            .map(|i| repo.commit_file("CHANGES", &format!("## 1.0.{}\n", i), "Release"))
            .collect();
        assert_eq!(ids.len(), 300);
        assert_ne!(MockRepository::commit_id(1), MockRepository::commit_id(257));
    }
}
