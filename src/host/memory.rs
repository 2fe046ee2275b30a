use crate::error::{ReleaseError, Result};
use crate::host::{HostedRepository, NewRelease, RefInfo, ReleaseInfo};
use git2::Oid;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Hosted repository kept entirely in memory
pub struct InMemoryHost {
    default_branch: String,
    branches: Vec<RefInfo>,
    tags: Vec<RefInfo>,
    releases: Mutex<Vec<ReleaseInfo>>,
    created: Mutex<Vec<NewRelease>>,
    rejected_tags: Vec<String>,
}

impl InMemoryHost {
    pub fn new(default_branch: impl Into<String>) -> Self {
        InMemoryHost {
            default_branch: default_branch.into(),
            branches: Vec::new(),
            tags: Vec::new(),
            releases: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            rejected_tags: Vec::new(),
        }
    }

    pub fn with_branch(mut self, name: &str, target: Oid) -> Self {
        self.branches.push(RefInfo::new(name, target));
        self
    }

    pub fn with_tag(mut self, name: &str, target: Oid) -> Self {
        self.tags.push(RefInfo::new(name, target));
        self
    }

    pub fn with_release(self, name: &str, tag: &str) -> Self {
        self.releases().push(ReleaseInfo {
            name: name.to_string(),
            tag: tag.to_string(),
        });
        self
    }

    /// Refuse to create releases for `tag`
    pub fn rejecting_tag(mut self, tag: &str) -> Self {
        self.rejected_tags.push(tag.to_string());
        self
    }

    /// Releases created through [HostedRepository::create_release]
    pub fn created(&self) -> Vec<NewRelease> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn releases(&self) -> MutexGuard<'_, Vec<ReleaseInfo>> {
        self.releases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostedRepository for InMemoryHost {
    fn default_branch(&self) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    fn list_branches(&self) -> Result<Vec<RefInfo>> {
        Ok(self.branches.clone())
    }

    fn list_tags(&self) -> Result<Vec<RefInfo>> {
        Ok(self.tags.clone())
    }

    fn list_releases(&self) -> Result<Vec<ReleaseInfo>> {
        Ok(self.releases().clone())
    }

    fn create_release(&self, release: &NewRelease) -> Result<()> {
        if self.rejected_tags.contains(&release.tag) {
            return Err(ReleaseError::host(format!(
                "release for tag '{}' was rejected",
                release.tag
            )));
        }
        self.releases().push(ReleaseInfo {
            name: release.name.clone(),
            tag: release.tag.clone(),
        });
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(release.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_host_lists() {
        let oid = Oid::from_bytes(&[1; 20]).unwrap();
        let host = InMemoryHost::new("main")
            .with_branch("main", oid)
            .with_tag("v1.0.0", oid)
            .with_release("v1.0.0", "v1.0.0");

        assert_eq!(host.default_branch().unwrap(), "main");
        assert_eq!(host.list_branches().unwrap().len(), 1);
        assert_eq!(host.list_tags().unwrap(), vec![RefInfo::new("v1.0.0", oid)]);
        assert_eq!(host.list_releases().unwrap().len(), 1);
        assert!(host.supports_releases());
    }

    #[test]
    fn test_in_memory_host_create_release() {
        let oid = Oid::from_bytes(&[1; 20]).unwrap();
        let host = InMemoryHost::new("main").rejecting_tag("v0.9.0");
        let release = NewRelease {
            name: "v1.0.0".to_string(),
            tag: "v1.0.0".to_string(),
            target: oid,
            body: "notes".to_string(),
        };

        host.create_release(&release).unwrap();
        assert_eq!(host.created(), vec![release.clone()]);
        assert_eq!(host.list_releases().unwrap().len(), 1);

        let rejected = NewRelease {
            tag: "v0.9.0".to_string(),
            ..release
        };
        assert!(host.create_release(&rejected).is_err());
    }
}
