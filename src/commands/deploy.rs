//! Deploy command - Merge a new Unity library into a project

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::warn;

use super::utils;
use crate::config::Profile;
use crate::unity::history::History;
use crate::unity::pipeline::{DeployReport, Event};
use crate::unity::Pipeline;

/// Options for the deploy command
#[derive(Debug, Default)]
pub struct DeployOptions {
    pub dry_run: bool,
    pub yes: bool,
    /// Manifest template name overriding the profile's selection
    pub manifest: Option<String>,
}

/// Execute the deploy command
pub fn execute(
    name: &str,
    profile: &Profile,
    options: &DeployOptions,
    history_db: &Path,
) -> Result<()> {
    let layout = profile.layout(options.manifest.as_deref())?;
    let pipeline = Pipeline::new(name, &layout, &profile.steps)?;

    println!();
    println!("{}", format!("=== Unity Library Deploy: {} ===", name).green());
    println!();
    println!("Project dir: {}", layout.project_dir.display());
    println!("New library: {}", layout.new_library.display());
    if let Some(template) = &layout.manifest_template {
        println!("Manifest:    {}", template.display());
    }
    println!();
    utils::print_exists_status(&layout.library_name, &layout.library());
    utils::print_exists_status(&layout.backup_name, &layout.backup());
    utils::print_exists_status("new library", &layout.new_library);
    println!();

    println!("Steps:");
    for (i, description) in pipeline.plan().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, description);
    }
    println!();

    pipeline
        .preflight()
        .with_context(|| format!("Profile '{}' is not ready to deploy", name))?;

    if options.dry_run {
        println!("{}", "(DRY-RUN) No changes made.".blue());
        return Ok(());
    }

    if !options.yes && !utils::confirm("Proceed?")? {
        println!("Aborted.");
        return Ok(());
    }

    let report = pipeline.run(print_event);
    record(history_db, &report);

    if let Some(failed) = report.failed_step() {
        bail!(
            "Deployment stopped at step {} ({}). Run `unity-deploy restore {}` to roll back.",
            failed.index + 1,
            failed.kind,
            name
        );
    }

    println!();
    println!(
        "{} {} steps in {}s",
        "Deployed:".green(),
        report.steps.len(),
        report.finished_at - report.started_at
    );
    Ok(())
}

fn print_event(event: Event<'_>) {
    match event {
        Event::Started {
            index,
            total,
            description,
            ..
        } => {
            println!(
                "{}",
                format!("Step {}/{}: {}...", index + 1, total, description).green()
            );
        }
        Event::Finished { summary, .. } => {
            println!("  -> {}", summary);
        }
        Event::Failed { error, .. } => {
            println!("  {} {}", "Failed:".red(), error);
        }
    }
}

/// Journal a run; a broken journal never fails the command
pub fn record(history_db: &Path, report: &DeployReport) {
    let result = History::open(history_db).and_then(|history| history.record(report));
    if let Err(e) = result {
        warn!(path = %history_db.display(), error = %e, "could not record run in history");
    }
}
