//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text and are tested directly; `display_*`
//! functions print it, styled with `console`.

use crate::changes::Finding;
use crate::domain::Style;
use crate::issues::ScanIssue;
use crate::reconcile::{ApplyReport, MissingArtifacts, ReconcilePlan};
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal issue found while scanning or creating artifacts.
pub fn display_issue(issue: &ScanIssue) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), issue);
}

/// Display validation findings, one per line, under a bold heading.
pub fn display_findings(title: &str, findings: &[Finding]) {
    println!("\n{}", style(title).bold());
    for finding in findings {
        println!("  {} {}", style("✗").red(), finding);
    }
}

/// Lines describing every missing artifact, named under `naming`.
pub fn format_missing(missing: &MissingArtifacts, naming: &Style) -> Vec<String> {
    let mut lines = Vec::with_capacity(missing.len());
    for version in &missing.branches {
        lines.push(format!(
            "Release branch '{}' for release {}",
            naming.branch_name(version),
            version
        ));
    }
    for version in &missing.tags {
        lines.push(format!("Release tag '{}'", naming.format(version)));
    }
    for version in &missing.releases {
        lines.push(format!("Release '{}'", naming.format(version)));
    }
    lines
}

/// Lines describing where each planned branch and tag will point.
pub fn format_plan(plan: &ReconcilePlan, naming: &Style) -> Vec<String> {
    let short = |commit: &git2::Oid| commit.to_string().chars().take(7).collect::<String>();
    let backfill = &plan.backfill.plan;

    let mut lines = Vec::with_capacity(backfill.branches.len() + backfill.tags.len());
    for planned in &backfill.branches {
        lines.push(format!(
            "branch {} -> {} ({})",
            naming.branch_name(&planned.version),
            short(&planned.commit),
            planned.version
        ));
    }
    for planned in &backfill.tags {
        lines.push(format!(
            "tag {} -> {}",
            naming.format(&planned.version),
            short(&planned.commit)
        ));
    }
    lines
}

/// Display the missing artifacts and the backfill plan.
pub fn display_plan(plan: &ReconcilePlan, naming: &Style) {
    if plan.missing.is_empty() {
        display_success("Every released version has its branch, tag and release");
        return;
    }

    println!("\n{}", style("Missing:").bold());
    for line in format_missing(&plan.missing, naming) {
        println!("  - {}", line);
    }

    let lines = format_plan(plan, naming);
    if !lines.is_empty() {
        println!("\n{}", style("Planned:").bold());
        for line in lines {
            println!("  {}", style(line).cyan());
        }
    }
    if plan.backfill.cancelled {
        display_status("History scan was cancelled; the plan is incomplete");
    }
    for issue in &plan.backfill.issues {
        display_issue(issue);
    }
}

/// Summarise what applying a plan achieved.
pub fn format_apply_report(report: &ApplyReport) -> String {
    format!(
        "Created {} release branches, {} release tags and {} releases",
        report.branches_created, report.tags_created, report.releases_created
    )
}

/// Display an apply report, including every failure.
pub fn display_apply_report(report: &ApplyReport) {
    display_success(&format_apply_report(report));
    for issue in &report.issues {
        display_issue(issue);
    }
}
