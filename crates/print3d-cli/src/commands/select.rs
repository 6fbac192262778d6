//! Resolve a saved report entry to mesh elements.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use print3d_toolbox::report::STALE_REPORT;
use print3d_toolbox::{ElementKind, Report, Selection};

use crate::commands::load_object;
use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
#[serde(tag = "selection", rename_all = "lowercase")]
enum SelectOutput {
    Nothing,
    Stale { warning: &'static str },
    Elements { kind: ElementKind, indices: Vec<usize> },
}

impl From<Selection> for SelectOutput {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Nothing => SelectOutput::Nothing,
            Selection::Stale => SelectOutput::Stale {
                warning: STALE_REPORT,
            },
            Selection::Elements { kind, indices } => SelectOutput::Elements { kind, indices },
        }
    }
}

pub fn run(input: &Path, report_path: &Path, entry: usize, cli: &Cli) -> Result<()> {
    let object = load_object(input)?;
    let report = Report::load(report_path)
        .with_context(|| format!("Failed to load report from {:?}", report_path))?;

    let selection: SelectOutput = report.select(entry, &object.mesh)?.into();

    match cli.format {
        OutputFormat::Json => output::print(&selection, cli.format, cli.quiet),
        OutputFormat::Text => match &selection {
            SelectOutput::Nothing => {
                output::success("Nothing to select", cli.format, cli.quiet);
            }
            SelectOutput::Stale { warning } => {
                if !cli.quiet {
                    eprintln!("{}: {}", "Warning".yellow().bold(), warning);
                }
            }
            SelectOutput::Elements { kind, indices } => {
                if !cli.quiet {
                    let kind = match kind {
                        ElementKind::Vertex => "vertices",
                        ElementKind::Edge => "edges",
                        ElementKind::Face => "faces",
                    };
                    println!("{}", format!("Selected {} {}", indices.len(), kind).bold());
                    let list: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                    println!("  {}", list.join(", "));
                }
            }
        },
    }

    Ok(())
}
