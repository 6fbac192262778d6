//! Move objects onto the build plate.

use std::path::{Path, PathBuf};

use anyhow::Result;

use print3d_toolbox::transform::{move_to_zero, reset_origin_and_move_to_zero};

use crate::commands::{finish_operator, load_scene, load_settings, report_written, save_objects};
use crate::Cli;

pub fn run(inputs: &[PathBuf], output_dir: &Path, reset_origin: bool, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut scene = load_scene(inputs)?;

    let result = if reset_origin {
        reset_origin_and_move_to_zero(&mut scene)
    } else {
        move_to_zero(&mut scene)
    };
    finish_operator(&result, cli)?;

    let written = save_objects(&scene.objects, output_dir, &settings)?;
    report_written(&result, written, cli);
    Ok(())
}
