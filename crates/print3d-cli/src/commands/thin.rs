//! Offset surfaces along their normals.

use std::path::{Path, PathBuf};

use anyhow::Result;

use print3d_toolbox::transform::thin_objects;

use crate::commands::{finish_operator, load_scene, load_settings, report_written, save_objects};
use crate::Cli;

pub fn run(inputs: &[PathBuf], output_dir: &Path, amount: Option<f64>, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut scene = load_scene(inputs)?;

    let amount = amount.unwrap_or(settings.thinning_amount);
    if !amount.is_finite() {
        anyhow::bail!("--amount must be finite, got {}", amount);
    }
    let result = thin_objects(&mut scene, amount);
    finish_operator(&result, cli)?;

    let written = save_objects(&scene.objects, output_dir, &settings)?;
    report_written(&result, written, cli);
    Ok(())
}
