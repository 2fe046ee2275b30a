//! Domain logic - pure value types independent of git operations

pub mod branch;
pub mod style;
pub mod version;

pub use branch::{parse_release_branch, BranchContext};
pub use style::{infer_style, merge, Style};
pub use version::{compare, sort_newest_first, FlavorOrdering, Version, VersionSet};
