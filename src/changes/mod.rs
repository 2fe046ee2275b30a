//! CHANGES document model
//!
//! A CHANGES file is free text in which some lines are version headings:
//!
//! ```text
//! # Project changes
//!
//! ## 2.2.1-dev
//!
//! * Fixed a crash
//!
//! ## 2.2.0  2020-02-10
//! ```
//!
//! [`ChangeLog`] keeps every raw line so that serializing a document always
//! reproduces the input exactly, and derives an ordered list of
//! [`VersionEntry`] records from the heading lines. Documents are newest
//! first: the topmost heading is the current version. Mutations never patch
//! entries in place; they regenerate the lines and reparse into a new
//! snapshot.

pub mod validation;

pub use validation::Finding;

use crate::domain::{sort_newest_first, FlavorOrdering, Style, Version, VersionSet};
use crate::error::{ReleaseError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// File names searched for when a directory is given to [`load`]
pub const DEFAULT_FILE_NAMES: &[&str] = &["CHANGES", "CHANGES.md"];

/// Separator written between a version and its date when none exists yet
const DEFAULT_SEPARATOR: &str = "  ";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn heading_pattern() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(
            r"^(#* *)((?:\w*-|v)?\d+\.\d+(?:\.\d+)?(?:-\w+)?)([ \t]*)(\d{4}-\d{2}-\d{2})?[ \t]*\r?$",
        )
        .expect("heading regex is valid")
    })
}

/// Carriage return kept at the end of `line`, so CRLF documents stay CRLF
fn line_ending(line: &str) -> &'static str {
    if line.ends_with('\r') {
        "\r"
    } else {
        ""
    }
}

/// A version heading found in a CHANGES document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// 1-based line number of the heading
    pub line: usize,
    /// Heading markers and indentation before the version, e.g. `"## "`
    pub marker: String,
    pub version: Version,
    /// Style the version token was written in
    pub style: Style,
    /// Text between the version token and the date
    pub separator: String,
    /// ISO date exactly as written, if any
    pub date: Option<String>,
}

impl VersionEntry {
    /// Render the heading line for this entry
    fn heading(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.marker);
        out.push_str(&self.style.format(&self.version));
        out.push_str(&self.separator);
        if let Some(date) = &self.date {
            out.push_str(date);
        }
        out
    }
}

/// Parsed content of a CHANGES document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLog {
    lines: Vec<String>,
    entries: Vec<VersionEntry>,
}

impl ChangeLog {
    /// Parse a CHANGES document from its text.
    ///
    /// # Errors
    /// Returns [`ReleaseError::Heading`] naming the offending line if a
    /// heading carries a version that cannot be represented.
    pub fn read(body: &str) -> Result<Self> {
        Self::from_lines(body.split('\n').map(str::to_string).collect())
    }

    fn from_lines(lines: Vec<String>) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let Some(caps) = heading_pattern().captures(line) else {
                continue;
            };
            let number = index + 1;
            let token = caps.get(2).map_or("", |m| m.as_str());
            let version = Version::parse(token).map_err(|e| e.on_line(number))?;
            let style = Style::parse(token).unwrap_or_default();

            entries.push(VersionEntry {
                line: number,
                marker: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                version,
                style,
                separator: caps.get(3).map_or("", |m| m.as_str()).to_string(),
                date: caps.get(4).map(|m| m.as_str().to_string()),
            });
        }
        debug!(lines = lines.len(), versions = entries.len(), "parsed CHANGES document");
        Ok(ChangeLog { lines, entries })
    }

    /// Version headings in document order (newest first by convention)
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All declared versions, sorted newest first
    pub fn versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self.entries.iter().map(|e| e.version.clone()).collect();
        sort_newest_first(&mut versions);
        versions
    }

    /// Declared versions that carry no flavor, i.e. those that should have
    /// been released
    pub fn released_versions(&self) -> VersionSet {
        self.entries
            .iter()
            .filter(|e| !e.version.is_flavored())
            .map(|e| e.version.clone())
            .collect()
    }

    /// The topmost (current) version, if the document declares any
    pub fn current_version(&self) -> Option<&Version> {
        self.entries.first().map(|e| &e.version)
    }

    /// Release notes for `version`: the text between its heading and the
    /// next heading, without surrounding blank lines.
    ///
    /// Returns `None` if the document does not declare `version`.
    pub fn release_notes(&self, version: &Version) -> Option<String> {
        let index = self.entries.iter().position(|e| &e.version == version)?;
        Some(self.notes_at(index))
    }

    /// Release notes for the topmost version
    pub fn current_version_notes(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.notes_at(0))
    }

    fn notes_at(&self, index: usize) -> String {
        // A heading's 1-based line number is the 0-based index of the line after it.
        let mut start = self.entries[index].line;
        let mut end = self
            .entries
            .get(index + 1)
            .map_or(self.lines.len(), |next| next.line - 1);

        while start < end && self.lines[start].trim().is_empty() {
            start += 1;
        }
        while end > start && self.lines[end - 1].trim().is_empty() {
            end -= 1;
        }
        self.lines[start..end]
            .iter()
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace the topmost version and stamp it with `date`.
    ///
    /// Only the topmost heading line changes; its markers and separator are
    /// kept (an empty separator becomes two spaces).
    ///
    /// # Errors
    /// Returns [`ReleaseError::NotFound`] if the document declares no versions.
    pub fn adjust_current_version(&self, version: Version, date: NaiveDate) -> Result<ChangeLog> {
        let current = self
            .entries
            .first()
            .ok_or_else(|| ReleaseError::not_found("CHANGES document declares no versions"))?;

        let mut entry = current.clone();
        entry.version = version;
        entry.date = Some(date.format(DATE_FORMAT).to_string());
        if entry.separator.is_empty() {
            entry.separator = DEFAULT_SEPARATOR.to_string();
        }

        let mut lines = self.lines.clone();
        let cr = line_ending(&lines[entry.line - 1]);
        lines[entry.line - 1] = entry.heading() + cr;
        Self::from_lines(lines)
    }

    /// Insert a new topmost version followed by `body`.
    ///
    /// The new heading copies the markers, style and separator of the current
    /// topmost heading, and is placed directly above it (or at the end of a
    /// document without versions).
    ///
    /// The topmost separator is only adopted when a date is given. An
    /// undated heading is written without one, so a stubbed `2.2.2-dev`
    /// never carries trailing whitespace, even above `2.2.1  2024-05-01`.
    pub fn add_new_version(
        &self,
        version: Version,
        date: Option<NaiveDate>,
        body: &str,
    ) -> Result<ChangeLog> {
        let template = self.entries.first();
        let mut entry = VersionEntry {
            line: 0,
            marker: template.map(|t| t.marker.clone()).unwrap_or_default(),
            version,
            style: template.map(|t| t.style.clone()).unwrap_or_default(),
            separator: String::new(),
            date: date.map(|d| d.format(DATE_FORMAT).to_string()),
        };
        if entry.date.is_some() {
            entry.separator = template
                .map(|t| t.separator.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        }

        let at = template.map_or(self.lines.len(), |t| t.line - 1);
        let cr = template.map_or("", |t| line_ending(&self.lines[t.line - 1]));

        let mut lines: Vec<String> = self.lines[..at].to_vec();
        if lines.last().is_some_and(|l| !l.trim().is_empty()) {
            lines.push(cr.to_string());
        }
        lines.push(entry.heading() + cr);
        lines.push(cr.to_string());
        if !body.is_empty() {
            lines.extend(body.split('\n').map(|l| format!("{}{}", l, cr)));
            lines.push(cr.to_string());
        }
        lines.extend_from_slice(&self.lines[at..]);
        Self::from_lines(lines)
    }

    /// Reject documents written oldest first.
    ///
    /// A document with more than one version whose headings strictly ascend
    /// cannot be reconciled: the topmost entry would not be the current
    /// version.
    pub fn ensure_newest_first(&self) -> Result<()> {
        let ascending = self.entries.len() > 1
            && self.entries.windows(2).all(|pair| {
                pair[1]
                    .version
                    .greater_than(&pair[0].version, FlavorOrdering::Aware)
            });
        if ascending {
            return Err(ReleaseError::UnsupportedOrder(format!(
                "versions ascend from {} on line {} to {} on line {}; CHANGES must list the newest version first",
                self.entries[0].version,
                self.entries[0].line,
                self.entries[self.entries.len() - 1].version,
                self.entries[self.entries.len() - 1].line,
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ChangeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Find the CHANGES file at `path`.
///
/// `path` may be the file itself, or a directory containing one of
/// `file_names` (searched in order).
pub fn locate<P: AsRef<Path>>(path: P, file_names: &[String]) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }
    file_names
        .iter()
        .map(|name| path.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            ReleaseError::not_found(format!(
                "no CHANGES file ({}) in '{}'",
                file_names.join(", "),
                path.display()
            ))
        })
}

/// Load a CHANGES document from a file, or from a directory searched as
/// [`locate`] does.
pub fn load<P: AsRef<Path>>(path: P, file_names: &[String]) -> Result<ChangeLog> {
    let file = locate(path, file_names)?;
    ChangeLog::read(&fs::read_to_string(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Project changes

## 2.2.1-dev

xxx
Notes about the 2.2.1 patch release
yyy

### 2.2.0 2020-02-10

* Feature A

## 1.0.0  2019-01-01
Initial release
";

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_round_trip() {
        for text in [
            SAMPLE,
            "",
            "\n\n",
            "no headings at all\njust prose",
            "1.0.0",
            "## v1.0\r\nwindows line endings\r\n",
            "  trailing spaces  \n### 3.0.0   \n",
        ] {
            let doc = ChangeLog::read(text).unwrap();
            assert_eq!(doc.to_string(), text);
        }
    }

    #[test]
    fn test_crlf_document() {
        let text = "## 1.1.0-dev\r\n\r\n* wip\r\n\r\n## 1.0.0  2024-01-02\r\n";
        let doc = ChangeLog::read(text).unwrap();
        let entries = doc.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, v("1.1.0-dev"));
        assert_eq!(entries[1].line, 5);
        assert_eq!(entries[1].date.as_deref(), Some("2024-01-02"));
        assert!(doc.validate(true).is_empty());
        assert_eq!(doc.current_version_notes().as_deref(), Some("* wip"));
        assert_eq!(doc.to_string(), text);

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let done = doc.adjust_current_version(v("1.1.0"), date).unwrap();
        assert!(done.to_string().starts_with("## 1.1.0  2024-05-01\r\n\r\n* wip\r\n"));
        let next = done.add_new_version(v("1.1.1-dev"), None, "TBD").unwrap();
        assert!(next
            .to_string()
            .starts_with("## 1.1.1-dev\r\n\r\nTBD\r\n\r\n## 1.1.0  2024-05-01\r\n"));
    }

    #[test]
    fn test_entries() {
        let doc = ChangeLog::read(SAMPLE).unwrap();
        let entries = doc.entries();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].line, 3);
        assert_eq!(entries[0].marker, "## ");
        assert_eq!(entries[0].version, v("2.2.1-dev"));
        assert_eq!(entries[0].date, None);

        assert_eq!(entries[1].line, 9);
        assert_eq!(entries[1].marker, "### ");
        assert_eq!(entries[1].separator, " ");
        assert_eq!(entries[1].date.as_deref(), Some("2020-02-10"));

        assert_eq!(entries[2].separator, "  ");
        assert_eq!(doc.current_version(), Some(&v("2.2.1-dev")));
    }

    #[test]
    fn test_non_heading_lines_are_inert() {
        let doc = ChangeLog::read("Version 1.0.0 was great\n* 2.0.0 bullet\n1.0.0 and more").unwrap();
        assert!(doc.entries().is_empty());
        assert_eq!(doc.current_version(), None);
    }

    #[test]
    fn test_overflowing_heading_reports_line() {
        let err = ChangeLog::read("intro\n\n## 99999999999.0.0\n").unwrap_err();
        match err {
            ReleaseError::Heading { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_current_version_notes() {
        let doc = ChangeLog::read(SAMPLE).unwrap();
        assert_eq!(
            doc.current_version_notes().as_deref(),
            Some("xxx\nNotes about the 2.2.1 patch release\nyyy")
        );
    }

    #[test]
    fn test_current_version_notes_without_versions() {
        let doc = ChangeLog::read("nothing here").unwrap();
        assert_eq!(doc.current_version_notes(), None);
    }

    #[test]
    fn test_release_notes() {
        let doc = ChangeLog::read(SAMPLE).unwrap();
        assert_eq!(doc.release_notes(&v("2.2.0")).as_deref(), Some("* Feature A"));
        assert_eq!(doc.release_notes(&v("1.0.0")).as_deref(), Some("Initial release"));
        assert_eq!(doc.release_notes(&v("3.0.0")), None);
        // The flavor is part of the identity.
        assert_eq!(doc.release_notes(&v("2.2.1")), None);
    }

    #[test]
    fn test_release_notes_empty_section() {
        let doc = ChangeLog::read("## 2.0.0\n\n\n## 1.0.0\n").unwrap();
        assert_eq!(doc.release_notes(&v("2.0.0")).as_deref(), Some(""));
    }

    #[test]
    fn test_versions_sorted_newest_first() {
        let doc = ChangeLog::read("## 1.0.0\n## 2.0.0-dev\n## 1.5.0\n").unwrap();
        assert_eq!(doc.versions(), vec![v("2.0.0-dev"), v("1.5.0"), v("1.0.0")]);
    }

    #[test]
    fn test_released_versions_skip_flavored() {
        let doc = ChangeLog::read(SAMPLE).unwrap();
        let released: Vec<_> = doc.released_versions().into_iter().collect();
        assert_eq!(released, vec![v("1.0.0"), v("2.2.0")]);
    }

    #[test]
    fn test_adjust_current_version() {
        let doc = ChangeLog::read(SAMPLE).unwrap();
        let adjusted = doc
            .adjust_current_version(v("2.2.1"), date(2020, 3, 1))
            .unwrap();

        assert_eq!(adjusted.lines()[2], "## 2.2.1  2020-03-01");
        assert_eq!(adjusted.current_version(), Some(&v("2.2.1")));
        assert_eq!(adjusted.entries()[0].date.as_deref(), Some("2020-03-01"));

        // Every other line is untouched.
        for (i, (before, after)) in doc.lines().iter().zip(adjusted.lines()).enumerate() {
            if i != 2 {
                assert_eq!(before, after);
            }
        }
        // The original snapshot is unchanged.
        assert_eq!(doc.to_string(), SAMPLE);
    }

    #[test]
    fn test_adjust_keeps_existing_separator_and_style() {
        let doc = ChangeLog::read("# v2.1 2020-01-01\n").unwrap();
        let adjusted = doc
            .adjust_current_version(v("2.2.0"), date(2021, 6, 30))
            .unwrap();
        assert_eq!(adjusted.lines()[0], "# v2.2 2021-06-30");
    }

    #[test]
    fn test_adjust_without_versions() {
        let doc = ChangeLog::read("prose").unwrap();
        let err = doc
            .adjust_current_version(v("1.0.0"), date(2020, 1, 1))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::NotFound(_)));
    }

    #[test]
    fn test_add_new_version() {
        let doc = ChangeLog::read("# Project changes\n\n## 2.2.0  2020-02-10\n\n* Feature A\n").unwrap();
        let added = doc
            .add_new_version(v("2.2.1-dev"), None, "[Add release notes here]")
            .unwrap();

        assert_eq!(
            added.to_string(),
            "# Project changes\n\n## 2.2.1-dev\n\n[Add release notes here]\n\n## 2.2.0  2020-02-10\n\n* Feature A\n"
        );
        assert_eq!(added.entries().len(), 2);
        assert_eq!(added.entries()[0].line, 3);
        assert_eq!(added.entries()[1].line, 7);
        assert_eq!(
            added.current_version_notes().as_deref(),
            Some("[Add release notes here]")
        );
    }

    #[test]
    fn test_add_new_version_adopts_style_and_separator() {
        let doc = ChangeLog::read("### v2.1 - 2020-02-10\n").unwrap();
        // "v2.1 - 2020..." is not a heading; use a plain separator instead.
        assert!(doc.entries().is_empty());

        let doc = ChangeLog::read("### v2.1   2020-02-10\n").unwrap();
        let added = doc
            .add_new_version(v("2.2.0"), Some(date(2020, 5, 1)), "")
            .unwrap();
        assert_eq!(added.lines()[0], "### v2.2   2020-05-01");
        assert_eq!(added.lines()[1], "");
        assert_eq!(added.lines()[2], "### v2.1   2020-02-10");
    }

    #[test]
    fn test_add_new_version_at_document_end() {
        let doc = ChangeLog::read("Changes").unwrap();
        let added = doc
            .add_new_version(v("0.1.0"), Some(date(2020, 1, 1)), "First")
            .unwrap();
        assert_eq!(added.to_string(), "Changes\n\n0.1.0  2020-01-01\n\nFirst\n");
        assert_eq!(added.current_version(), Some(&v("0.1.0")));
    }

    #[test]
    fn test_add_new_version_with_heading_on_first_line() {
        let doc = ChangeLog::read("## 1.0.0\n").unwrap();
        let added = doc.add_new_version(v("1.0.1-dev"), None, "").unwrap();
        assert_eq!(added.to_string(), "## 1.0.1-dev\n\n## 1.0.0\n");
    }

    #[test]
    fn test_ensure_newest_first() {
        assert!(ChangeLog::read(SAMPLE).unwrap().ensure_newest_first().is_ok());
        assert!(ChangeLog::read("## 1.0.0").unwrap().ensure_newest_first().is_ok());

        let reversed = ChangeLog::read("## 1.0.0\n## 1.1.0\n## 2.0.0-dev\n").unwrap();
        let err = reversed.ensure_newest_first().unwrap_err();
        assert!(matches!(err, ReleaseError::UnsupportedOrder(_)));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CHANGES.md"), "## 1.0.0\n").unwrap();
        let names: Vec<String> = DEFAULT_FILE_NAMES.iter().map(|s| s.to_string()).collect();

        let doc = load(dir.path(), &names).unwrap();
        assert_eq!(doc.current_version(), Some(&v("1.0.0")));
        assert_eq!(
            locate(dir.path(), &names).unwrap(),
            dir.path().join("CHANGES.md")
        );

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(empty.path(), &names).unwrap_err(),
            ReleaseError::NotFound(_)
        ));
    }
}
