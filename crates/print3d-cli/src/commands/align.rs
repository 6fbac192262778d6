//! Align selected faces to the build plate.

use std::path::Path;

use anyhow::Result;

use print3d_toolbox::{PrintError, Scene};
use print3d_toolbox::transform::align_to_xy;

use crate::commands::{finish_operator, load_object, report_written, save_object};
use crate::Cli;

pub fn run(input: &Path, output_path: &Path, faces: &[usize], face_area: bool, cli: &Cli) -> Result<()> {
    let mut object = load_object(input)?;
    let face_count = object.mesh.face_count();
    if let Some(&bad) = faces.iter().find(|&&f| f >= face_count) {
        return Err(PrintError::invalid_selection(format!(
            "face {} out of range, mesh has {} faces",
            bad, face_count
        ))
        .into());
    }
    object.selected_faces = faces.to_vec();

    let mut scene = Scene::new(vec![object]);
    let result = align_to_xy(&mut scene, face_area);
    finish_operator(&result, cli)?;

    let mut written = Vec::new();
    if let Some(object) = scene.objects.first() {
        save_object(object, output_path)?;
        written.push(output_path.to_path_buf());
    }
    report_written(&result, written, cli);
    Ok(())
}
