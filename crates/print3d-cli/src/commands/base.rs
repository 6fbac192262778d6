//! Vacuum-forming base generation command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use print3d_base::{BaseParams, create_bases};

use crate::commands::{finish_operator, load_scene, load_settings, report_written, save_objects};
use crate::Cli;

pub fn run(
    inputs: &[PathBuf],
    output_dir: &Path,
    bottom_thickness: Option<f64>,
    voxel_size: Option<f64>,
    cli: &Cli,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut scene = load_scene(inputs)?;
    let loaded = scene.objects.len();

    let mut params = BaseParams::from_settings(&settings);
    if let Some(thickness) = bottom_thickness {
        params.bottom_thickness = thickness;
    }
    if let Some(size) = voxel_size {
        params.voxel_size = size;
    }
    params.validate()?;

    let result = create_bases(&mut scene, &params);
    finish_operator(&result, cli)?;

    let written = save_objects(&scene.objects[loaded..], output_dir, &settings)?;
    report_written(&result, written, cli);
    Ok(())
}
