//! Printability check command.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use print3d_toolbox::{CheckKind, Scene, run_checks};

use crate::commands::{load_object, load_settings};
use crate::{Cli, OutputFormat, output};

/// Parse `--only`; an empty list means every check.
fn parse_kinds(only: &[String]) -> Result<Vec<CheckKind>> {
    if only.is_empty() {
        return Ok(CheckKind::ALL.to_vec());
    }
    let kinds = only
        .iter()
        .map(|s| s.parse::<CheckKind>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(kinds)
}

pub fn run(input: &Path, only: &[String], report_path: Option<&Path>, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let kinds = parse_kinds(only)?;
    let scene = Scene::new(vec![load_object(input)?]);

    let (report, notices) = run_checks(&scene, &kinds, &settings);
    output::notices(&notices, cli.format, cli.quiet);

    if let Some(path) = report_path {
        report
            .save(path)
            .with_context(|| format!("Failed to save report to {:?}", path))?;
    }

    match cli.format {
        OutputFormat::Json => output::print(&report, cli.format, cli.quiet),
        OutputFormat::Text => {
            if cli.quiet {
                return Ok(());
            }
            let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
            println!("{}", format!("Checks: {}", names.join(", ")).bold());
            for (i, entry) in report.entries.iter().enumerate() {
                let flagged = entry.selector.as_ref().map_or(0, |s| s.indices.len());
                let line = format!("  [{}] {}", i, entry.message);
                if flagged > 0 {
                    println!("{}", line.yellow());
                } else {
                    println!("{}", line);
                }
            }
            if report.flagged_count() == 0 {
                output::success("No problems found", cli.format, cli.quiet);
            }
            if let Some(path) = report_path {
                output::success(&format!("Report saved to {}", path.display()), cli.format, cli.quiet);
            }
        }
    }

    Ok(())
}
