//! Scale-to-volume and scale-to-bounds command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use print3d_toolbox::transform::{scale_to_bounds, scale_to_volume};

use crate::commands::{finish_operator, load_scene, load_settings, report_written, save_objects};
use crate::{Cli, ScaleTarget};

pub fn run(inputs: &[PathBuf], output_dir: &Path, target: &ScaleTarget, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut scene = load_scene(inputs)?;

    let result = match (target.volume, target.bounds) {
        (Some(volume), _) => scale_to_volume(&mut scene, volume),
        (None, Some(bounds)) => scale_to_bounds(&mut scene, bounds),
        (None, None) => anyhow::bail!("either --volume or --bounds is required"),
    };
    finish_operator(&result, cli)?;

    let written = save_objects(&scene.objects, output_dir, &settings)?;
    report_written(&result, written, cli);
    Ok(())
}
