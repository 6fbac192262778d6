//! Export command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use print3d_toolbox::{MeshObject, export_objects};

use crate::commands::{load_scene, load_settings};
use crate::{Cli, OutputFormat, output};

pub fn run(inputs: &[PathBuf], base_dir: Option<&Path>, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let scene = load_scene(inputs)?;

    let base_dir = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    let objects: Vec<&MeshObject> = scene.selected_objects().collect();
    let exported = export_objects(&objects, &settings, &base_dir)?;

    match cli.format {
        OutputFormat::Json => output::print(&exported, cli.format, cli.quiet),
        OutputFormat::Text => output::success(&exported.message(), cli.format, cli.quiet),
    }
    Ok(())
}
