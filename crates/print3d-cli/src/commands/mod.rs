//! Subcommand implementations and the helpers they share.

pub mod align;
pub mod base;
pub mod check;
pub mod clean;
pub mod export;
pub mod info;
pub mod place;
pub mod project;
pub mod scale;
pub mod select;
pub mod thin;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use print3d_toolbox::io::clean_name;
use print3d_toolbox::{MeshObject, NoticeLevel, OperatorResult, PrintSettings, Scene, load_mesh, save_mesh};

use crate::{Cli, output};

/// Settings from `--config`, or the defaults.
pub fn load_settings(cli: &Cli) -> Result<PrintSettings> {
    let settings = match &cli.config {
        Some(path) => PrintSettings::load(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?,
        None => PrintSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

/// Load a mesh file as an object named after the file stem.
pub fn load_object(path: &Path) -> Result<MeshObject> {
    let mesh = load_mesh(path).with_context(|| format!("Failed to load mesh from {:?}", path))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("object")
        .to_string();
    debug!(name = %name, vertices = mesh.vertex_count(), faces = mesh.face_count(), "loaded object");
    Ok(MeshObject::new(name, mesh))
}

/// Scene of all `paths`, all selected, the first one active.
pub fn load_scene(paths: &[PathBuf]) -> Result<Scene> {
    let objects = paths
        .iter()
        .map(|p| load_object(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(Scene::new(objects))
}

/// Save an object's world-space mesh.
pub fn save_object(object: &MeshObject, path: &Path) -> Result<()> {
    save_mesh(&object.world_mesh(), path)
        .with_context(|| format!("Failed to save mesh to {:?}", path))?;
    Ok(())
}

/// Save each object as `dir/{name}.{ext}` and return the written paths.
pub fn save_objects<'a>(
    objects: impl IntoIterator<Item = &'a MeshObject>,
    dir: &Path,
    settings: &PrintSettings,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    let ext = settings.export_format.extension();
    let mut written = Vec::new();
    for object in objects {
        let path = dir.join(format!("{}.{}", clean_name(&object.name), ext));
        save_object(object, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Print the notices of an operator; a cancelled operator is an error.
pub fn finish_operator(result: &OperatorResult, cli: &Cli) -> Result<()> {
    output::notices(&result.notices, cli.format, cli.quiet);
    if !result.is_finished() {
        let reason: Vec<&str> = result.messages(NoticeLevel::Warning).collect();
        bail!("Operation cancelled: {}", reason.join("; "));
    }
    Ok(())
}

/// Operator notices plus the files written, for JSON output.
#[derive(Debug, Serialize)]
pub struct OperatorOutput<'a> {
    #[serde(flatten)]
    pub result: &'a OperatorResult,
    pub written: Vec<PathBuf>,
}

/// Shared tail of the scene operators: report, then list written files.
pub fn report_written(result: &OperatorResult, written: Vec<PathBuf>, cli: &Cli) {
    match cli.format {
        crate::OutputFormat::Json => output::print(&OperatorOutput { result, written }, cli.format, cli.quiet),
        crate::OutputFormat::Text => {
            for path in &written {
                output::success(&format!("Wrote {}", path.display()), cli.format, cli.quiet);
            }
        }
    }
}
