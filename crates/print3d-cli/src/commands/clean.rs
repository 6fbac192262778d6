//! Mesh cleanup command.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use print3d_toolbox::repair::{CleanOutcome, CleanParams, clean_distorted, clean_non_manifold};

use crate::commands::{load_object, load_settings, save_object};
use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum CleanResult {
    NonManifold(CleanOutcome),
    Distorted { triangulated: usize },
}

impl CleanResult {
    fn message(&self) -> String {
        match self {
            CleanResult::NonManifold(outcome) => outcome.message(),
            CleanResult::Distorted { triangulated } => format!("Triangulated {} faces", triangulated),
        }
    }
}

pub fn run(
    input: &Path,
    output_path: &Path,
    distorted: bool,
    threshold: Option<f64>,
    sides: Option<usize>,
    cli: &Cli,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut object = load_object(input)?;

    let result = if distorted {
        let triangulated = clean_distorted(&mut object.mesh, settings.angle_distort_rad());
        CleanResult::Distorted { triangulated }
    } else {
        let defaults = CleanParams::default();
        let params = CleanParams {
            threshold: threshold.unwrap_or(defaults.threshold),
            sides: sides.unwrap_or(defaults.sides),
        };
        if params.threshold < 0.0 {
            anyhow::bail!("--threshold must not be negative, got {}", params.threshold);
        }
        CleanResult::NonManifold(clean_non_manifold(&mut object.mesh, &params))
    };

    save_object(&object, output_path)?;

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::success(&result.message(), cli.format, cli.quiet);
            if let CleanResult::NonManifold(outcome) = &result
                && outcome.fix.cycled
                && !cli.quiet
            {
                println!("  Cleanup stopped on a repeating state; some non-manifold geometry may remain");
            }
            output::success(
                &format!("Saved to {}", output_path.display()),
                cli.format,
                cli.quiet,
            );
        }
    }

    Ok(())
}
