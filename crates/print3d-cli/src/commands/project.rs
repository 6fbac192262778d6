//! Flatten objects onto the XY plane.

use std::path::{Path, PathBuf};

use anyhow::Result;

use print3d_toolbox::transform::project_to_xy;

use crate::commands::{finish_operator, load_scene, load_settings, report_written, save_objects};
use crate::Cli;

pub fn run(inputs: &[PathBuf], output_dir: &Path, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut scene = load_scene(inputs)?;
    let loaded = scene.objects.len();

    let result = project_to_xy(&mut scene);
    finish_operator(&result, cli)?;

    // only the projections are new
    let written = save_objects(&scene.objects[loaded..], output_dir, &settings)?;
    report_written(&result, written, cli);
    Ok(())
}
