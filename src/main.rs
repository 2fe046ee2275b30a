use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use release_sync::changes::{self, ChangeLog};
use release_sync::config::{self, Config};
use release_sync::domain::Version;
use release_sync::git::Git2Repository;
use release_sync::reconcile::{CancellationToken, Reconciler};
use release_sync::{release, telemetry, ui};

#[derive(Parser)]
#[command(
    name = "release-sync",
    version,
    about = "Keep release branches, tags and releases in step with a CHANGES file"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, global = true, help = "Show debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a CHANGES file for structural problems
    Validate {
        /// CHANGES file, or a directory containing one
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long, help = "Require the top-most version to be flavored")]
        development: bool,
    },
    /// Print the release notes of a version
    Notes {
        /// Version to print; the current version when omitted
        version: Option<String>,

        #[arg(long, default_value = ".", help = "CHANGES file, or a directory containing one")]
        path: PathBuf,
    },
    /// Finalize the current version and open the next one
    Cut {
        #[arg(default_value = ".", help = "CHANGES file, or a directory containing one")]
        path: PathBuf,

        #[arg(long, help = "Release date (YYYY-MM-DD), today when omitted")]
        date: Option<NaiveDate>,

        #[arg(long, help = "Do not stub the next version")]
        no_stub: bool,
    },
    /// List missing release branches, tags and releases and where they belong
    Plan {
        #[arg(long, default_value = ".", help = "Local git repository")]
        repo: PathBuf,

        #[arg(long, help = "Create the missing artifacts")]
        apply: bool,

        #[arg(long, help = "Push created branches and tags")]
        push: bool,

        #[arg(short, long, help = "Skip confirmation prompts")]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(telemetry::level_for(args.verbose));

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Validate { path, development } => validate(&config, &path, development),
        Command::Notes { version, path } => notes(&config, version.as_deref(), &path),
        Command::Cut {
            path,
            date,
            no_stub,
        } => cut(&config, &path, date, !no_stub),
        Command::Plan {
            repo,
            apply,
            push,
            yes,
        } => plan(config, &repo, apply, push, yes),
    }
}

fn validate(config: &Config, path: &Path, development: bool) -> Result<()> {
    let doc = changes::load(path, &config.changes.file_names)?;
    let findings = doc.validate(development);
    if findings.is_empty() {
        ui::display_success("CHANGES file is valid");
        return Ok(());
    }
    ui::display_findings(&format!("{} problem(s) found", findings.len()), &findings);
    std::process::exit(1);
}

fn notes(config: &Config, version: Option<&str>, path: &Path) -> Result<()> {
    let doc = changes::load(path, &config.changes.file_names)?;
    let notes = match version {
        Some(text) => {
            let version = Version::parse(text)?;
            doc.release_notes(&version)
                .with_context(|| format!("Version {} is not in the CHANGES file", version))?
        }
        None => doc
            .current_version_notes()
            .context("CHANGES file does not contain any versions")?,
    };
    println!("{}", notes);
    Ok(())
}

fn cut(config: &Config, path: &Path, date: Option<NaiveDate>, stub: bool) -> Result<()> {
    let file = changes::locate(path, &config.changes.file_names)?;
    let doc = ChangeLog::read(&fs::read_to_string(&file)?)?;

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let done = release::finalize(&doc, date)?;
    ui::display_status(&format!(
        "Commit message:\n{}",
        release::finalize_message(&done.version, done.changes.current_version_notes().as_deref())
    ));

    let out = if stub {
        let next = release::stub_next(&done.changes, &done.version, &done.flavor)?;
        ui::display_status(&format!(
            "Commit message:\n{}",
            release::stub_message(&done.version)
        ));
        next
    } else {
        done.changes
    };

    fs::write(&file, out.to_string())
        .with_context(|| format!("Failed to write '{}'", file.display()))?;
    ui::display_success(&format!("Released {} in '{}'", done.version, file.display()));
    Ok(())
}

fn plan(config: Config, repo_path: &Path, apply: bool, push: bool, yes: bool) -> Result<()> {
    let repo = match Git2Repository::open(repo_path) {
        Ok(repo) => repo,
        Err(e) => {
            ui::display_error(&format!("Git repository error: {}", e));
            std::process::exit(1);
        }
    };
    let push = push || config.reconcile.push;
    let reconciler = Reconciler::new(&repo, &repo, config);

    let inventory = reconciler.inventory()?;
    for branch in reconciler.validate_branches(&inventory) {
        ui::display_findings(&format!("Branch '{}'", branch.branch), &branch.findings);
    }

    let plan = reconciler.plan(&inventory, &CancellationToken::new())?;
    ui::display_plan(&plan, &inventory.style);

    if !apply || plan.missing.is_empty() {
        return Ok(());
    }
    if !yes && !ui::confirm_action("Create the missing artifacts?")? {
        println!("Operation cancelled by user.");
        return Ok(());
    }

    let report = reconciler.apply(&inventory, &plan, push);
    ui::display_apply_report(&report);
    if !report.issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
