use regex::Regex;
use std::sync::OnceLock;

/// Represents a git branch with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub name: String,
    pub is_main: bool,
    /// Major version line this branch maintains, for names like `release-2.x.x`
    pub release_major: Option<u32>,
}

impl BranchContext {
    /// Create a new branch context, `main_branch` being the repository's
    /// default (development) branch
    pub fn new(name: impl Into<String>, main_branch: &str) -> Self {
        let name = name.into();
        let is_main = name == main_branch;
        let release_major = parse_release_branch(&name);

        BranchContext {
            name,
            is_main,
            release_major,
        }
    }

    /// Check if this branch maintains a major release line
    pub fn is_release_branch(&self) -> bool {
        self.release_major.is_some()
    }
}

/// Parse the major version from a release branch name such as
/// `release-2.x.x`, `v3.x` or `1.x.x`
pub fn parse_release_branch(name: &str) -> Option<u32> {
    static RELEASE_BRANCH: OnceLock<Regex> = OnceLock::new();
    let re = RELEASE_BRANCH.get_or_init(|| {
        Regex::new(r"^(?:\w*-|v)?(\d+)\.x+(?:\.x+)?$").expect("release branch regex is valid")
    });
    let caps = re.captures(name)?;
    caps.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_branch() {
        let branch = BranchContext::new("main", "main");
        assert!(branch.is_main);
        assert!(!branch.is_release_branch());
    }

    #[test]
    fn test_custom_main_branch() {
        let branch = BranchContext::new("trunk", "trunk");
        assert!(branch.is_main);
        assert!(!BranchContext::new("main", "trunk").is_main);
    }

    #[test]
    fn test_release_branch() {
        let branch = BranchContext::new("release-2.x.x", "main");
        assert!(!branch.is_main);
        assert_eq!(branch.release_major, Some(2));
        assert!(branch.is_release_branch());
    }

    #[test]
    fn test_parse_release_branch() {
        assert_eq!(parse_release_branch("release-2.x.x"), Some(2));
        assert_eq!(parse_release_branch("v13.x"), Some(13));
        assert_eq!(parse_release_branch("1.x.x"), Some(1));
        assert_eq!(parse_release_branch("release-2.1.0"), None);
        assert_eq!(parse_release_branch("develop"), None);
    }
}
