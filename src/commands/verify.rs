//! Verify command - Check a deployed library against its profile

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use crate::config::Profile;
use crate::unity::verify::{self, Check, CheckStatus};

/// Execute the verify command, returning the rendered table.
///
/// `manifest` names the template the library was deployed with. Errors when
/// any check fails.
pub fn execute(profile: &Profile, manifest: Option<&str>) -> Result<String> {
    let layout = profile.layout(manifest)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("Step"),
        Cell::new("Result"),
        Cell::new("Detail"),
    ]);

    let mut failures = 0;
    for (i, step) in profile.steps.iter().enumerate() {
        let check = verify::check(step, &layout).unwrap_or_else(|e| Check {
            status: CheckStatus::Fail,
            detail: e.to_string(),
        });
        let (label, color) = match check.status {
            CheckStatus::Pass => ("pass", Color::Green),
            CheckStatus::Fail => ("FAIL", Color::Red),
            CheckStatus::Skip => ("skip", Color::Yellow),
        };
        if check.status == CheckStatus::Fail {
            failures += 1;
        }

        let name = match step.path() {
            Some(path) => format!("{} {}", step.kind(), path),
            None => step.kind().to_string(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(name),
            Cell::new(label).fg(color),
            Cell::new(check.detail),
        ]);
    }

    let output = table.to_string();
    if failures > 0 {
        println!("{}", output);
        bail!("{} of {} checks failed", failures, profile.steps.len());
    }
    Ok(format!("{}\n\nAll {} checks passed", output, profile.steps.len()))
}
