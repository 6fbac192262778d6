//! Mesh information command.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use print3d_toolbox::checks::{info_area, info_volume};
use print3d_toolbox::{EdgeTable, MeshFormat};

use crate::commands::{load_object, load_settings};
use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
struct MeshInfo {
    name: String,
    format: Option<&'static str>,
    vertices: usize,
    edges: usize,
    faces: usize,
    triangulated: bool,
    bounds: Option<BoundsInfo>,
    volume: String,
    area: String,
}

#[derive(Debug, Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    size: [f64; 3],
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let object = load_object(input)?;
    let mesh = &object.mesh;

    let bounds = object.world_vertex_bounds().map(|b| {
        let size = b.extents();
        BoundsInfo {
            min: [b.min.x, b.min.y, b.min.z],
            max: [b.max.x, b.max.y, b.max.z],
            size: [size.x, size.y, size.z],
        }
    });

    let first_message = |report: print3d_toolbox::Report| {
        report
            .entries
            .into_iter()
            .next()
            .map(|e| e.message)
            .unwrap_or_default()
    };

    let info = MeshInfo {
        name: object.name.clone(),
        format: MeshFormat::from_path(input).map(|f| f.name()),
        vertices: mesh.vertex_count(),
        edges: EdgeTable::build(mesh).edge_count(),
        faces: mesh.face_count(),
        triangulated: mesh.is_triangulated(),
        bounds,
        volume: first_message(info_volume(&object, &settings)),
        area: first_message(info_area(&object, &settings)),
    };

    match cli.format {
        OutputFormat::Json => output::print(&info, cli.format, cli.quiet),
        OutputFormat::Text => {
            if cli.quiet {
                return Ok(());
            }
            println!("{}", format!("Mesh: {}", input.display()).bold());
            if let Some(format) = info.format {
                println!("  Format:       {}", format);
            }
            println!("  Vertices:     {}", info.vertices);
            println!("  Edges:        {}", info.edges);
            println!("  Faces:        {}", info.faces);
            println!("  Triangulated: {}", info.triangulated);
            if let Some(b) = &info.bounds {
                println!(
                    "  Bounds:       [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
                    b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2]
                );
                println!(
                    "  Size:         {:.3} x {:.3} x {:.3}",
                    b.size[0], b.size[1], b.size[2]
                );
            }
            println!("  {}", info.volume);
            println!("  {}", info.area);
        }
    }

    Ok(())
}
