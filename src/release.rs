//! Cutting a release from a CHANGES document
//!
//! A release turns the flavored topmost version (`2.2.1-dev`) into a dated
//! release (`2.2.1  2024-05-01`), then opens the next patch version with the
//! same flavor so development can continue.

use crate::changes::ChangeLog;
use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use chrono::NaiveDate;
use tracing::info;

/// Body given to a freshly stubbed version
pub const PLACEHOLDER_NOTES: &str = "[Add release notes here]";

/// A finalized document and what was released
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub changes: ChangeLog,
    /// The released, unflavored version
    pub version: Version,
    /// Flavor the topmost version carried before release
    pub flavor: String,
}

/// Drop the flavor from the topmost version and stamp it with `date`.
///
/// # Errors
/// Fails if the document has no versions or its topmost version is not
/// flavored, i.e. there is nothing to release.
pub fn finalize(doc: &ChangeLog, date: NaiveDate) -> Result<Finalized> {
    let current = doc
        .current_version()
        .ok_or_else(|| ReleaseError::not_found("CHANGES document declares no versions"))?;
    let flavor = current
        .flavor()
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::NothingToRelease(current.to_string()))?;

    let version = current.without_flavor();
    let changes = doc.adjust_current_version(version.clone(), date)?;
    info!(%version, %date, "Finalized release notes");
    Ok(Finalized {
        changes,
        version,
        flavor,
    })
}

/// Open the patch version after `released`, flavored with `flavor`, with
/// placeholder notes
///
/// # Errors
/// Fails if the patch number of `released` is already at its maximum.
pub fn stub_next(doc: &ChangeLog, released: &Version, flavor: &str) -> Result<ChangeLog> {
    let patch = released.patch.checked_add(1).ok_or_else(|| {
        ReleaseError::format(released.to_string(), "patch component cannot be incremented")
    })?;
    let next = Version::new(released.major, released.minor, patch).with_flavor(flavor);
    info!(version = %next, "Stubbed next version");
    doc.add_new_version(next, None, PLACEHOLDER_NOTES)
}

/// Commit message for the finalized CHANGES file
pub fn finalize_message(version: &Version, notes: Option<&str>) -> String {
    let mut msg = format!("Finalize release notes for {}\n\n", version);
    if let Some(notes) = notes.filter(|n| !n.is_empty()) {
        msg.push_str("Release Notes:\n\n");
        msg.push_str(notes);
    }
    msg
}

/// Commit message for the stubbed CHANGES file
pub fn stub_message(released: &Version) -> String {
    format!("Stub release notes for {}\n\n", released)
}
