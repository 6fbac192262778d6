//! Mesh file I/O for STL, OBJ, PLY and X3D, plus the export operator.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PrintError, PrintResult};
use crate::object::MeshObject;
use crate::settings::PrintSettings;
use crate::tracing_ext::log_io_operation;
use crate::units::UnitSystem;
use crate::{Mesh, Vertex, VertexColor};

/// File formats understood by [`load_mesh`] and [`save_mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Ply,
    /// Write only.
    X3d,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "obj" => Some(MeshFormat::Obj),
                "ply" => Some(MeshFormat::Ply),
                "x3d" => Some(MeshFormat::X3d),
                _ => None,
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            MeshFormat::Stl => "STL",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Ply => "PLY",
            MeshFormat::X3d => "X3D",
        }
    }
}

/// Export format setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    Obj,
    Ply,
    #[default]
    Stl,
    X3d,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Obj => "obj",
            ExportFormat::Ply => "ply",
            ExportFormat::Stl => "stl",
            ExportFormat::X3d => "x3d",
        }
    }

    fn mesh_format(self) -> MeshFormat {
        match self {
            ExportFormat::Obj => MeshFormat::Obj,
            ExportFormat::Ply => MeshFormat::Ply,
            ExportFormat::Stl => MeshFormat::Stl,
            ExportFormat::X3d => MeshFormat::X3d,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OBJ" => Ok(ExportFormat::Obj),
            "PLY" => Ok(ExportFormat::Ply),
            "STL" => Ok(ExportFormat::Stl),
            "X3D" => Ok(ExportFormat::X3d),
            other => Err(PrintError::invalid_argument(
                "export_format",
                format!("unknown format `{}`, expected OBJ, PLY, STL or X3D", other),
            )),
        }
    }
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> PrintResult<Mesh> {
    let format = MeshFormat::from_path(path)
        .ok_or_else(|| PrintError::unsupported_format(extension_of(path)))?;

    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let mesh = match format {
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::Ply => load_ply(path)?,
        MeshFormat::X3d => return Err(PrintError::unsupported_format(extension_of(path))),
    };

    if let Some((min, max)) = mesh.bounds() {
        let dims = max - min;
        info!(
            "Loaded mesh: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );
        debug!("Dimensions: {:.4} x {:.4} x {:.4}", dims.x, dims.y, dims.z);
    }

    if mesh.vertices.is_empty() || mesh.faces.is_empty() {
        return Err(PrintError::empty_mesh("mesh has no vertices or faces"));
    }

    validate_mesh_data(&mesh)?;
    log_io_operation("load", path, format.name());
    Ok(mesh)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(String::from)
}

/// Reject out-of-range face indices and non-finite coordinates.
pub fn validate_mesh_data(mesh: &Mesh) -> PrintResult<()> {
    for (i, v) in mesh.vertices.iter().enumerate() {
        for (axis, value) in ["x", "y", "z"].into_iter().zip(v.position.coords.iter()) {
            if !value.is_finite() {
                return Err(PrintError::invalid_coordinate(i, axis, *value));
            }
        }
    }
    let count = mesh.vertex_count();
    for (f, face) in mesh.faces.iter().enumerate() {
        if let Some(&bad) = face.iter().find(|&&idx| idx as usize >= count) {
            return Err(PrintError::invalid_vertex_index(f, bad, count));
        }
    }
    for edge in &mesh.loose_edges {
        if let Some(&bad) = edge.iter().find(|&&idx| idx as usize >= count) {
            return Err(PrintError::invalid_vertex_index(mesh.face_count(), bad, count));
        }
    }
    Ok(())
}

/// Load mesh from STL file (binary or ASCII).
fn load_stl(path: &Path) -> PrintResult<Mesh> {
    let file = File::open(path).map_err(|e| PrintError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    // read_stl already merges coincident corners into an indexed mesh
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| PrintError::parse_error(path, e.to_string()))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices.push(Vertex::from_coords(
            v.0[0] as f64,
            v.0[1] as f64,
            v.0[2] as f64,
        ));
    }
    for face in &stl.faces {
        let [a, b, c] = face.vertices;
        mesh.faces.push(vec![a as u32, b as u32, c as u32]);
    }

    debug!(
        "STL loaded: {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Load mesh from OBJ file, keeping polygons.
fn load_obj(path: &Path) -> PrintResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )
    .map_err(|e| PrintError::parse_error(path, e.to_string()))?;

    if models.is_empty() {
        return Err(PrintError::empty_mesh("OBJ file contains no models"));
    }

    let mut mesh = Mesh::new();
    for model in &models {
        let obj = &model.mesh;
        let offset = mesh.vertices.len() as u32;

        for chunk in obj.positions.chunks_exact(3) {
            mesh.vertices.push(Vertex::from_coords(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
        }

        // An empty arity list means every face is a triangle
        let mut cursor = 0;
        let arities: Vec<usize> = if obj.face_arities.is_empty() {
            vec![3; obj.indices.len() / 3]
        } else {
            obj.face_arities.iter().map(|&n| n as usize).collect()
        };
        for n in arities {
            let Some(corners) = obj.indices.get(cursor..cursor + n) else {
                warn!(model = %model.name, "OBJ face list shorter than its arities");
                break;
            };
            mesh.faces
                .push(corners.iter().map(|&i| i + offset).collect());
            cursor += n;
        }
        debug!(model = %model.name, faces = mesh.faces.len(), "OBJ model loaded");
    }

    Ok(mesh)
}

/// Load mesh from PLY file (ASCII or binary), keeping polygons, normals and
/// colors.
fn load_ply(path: &Path) -> PrintResult<Mesh> {
    use ply_rs::parser::Parser;

    let file = File::open(path).map_err(|e| PrintError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<ply_rs::ply::DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| PrintError::parse_error(path, format!("PLY parse error: {:?}", e)))?;

    let mut mesh = Mesh::new();

    if let Some(vertices) = ply.payload.get("vertex") {
        for element in vertices {
            let x = ply_float(element.get("x"), "x", path)?;
            let y = ply_float(element.get("y"), "y", path)?;
            let z = ply_float(element.get("z"), "z", path)?;
            let mut vertex = Vertex::from_coords(x, y, z);

            if let (Ok(nx), Ok(ny), Ok(nz)) = (
                ply_float(element.get("nx"), "nx", path),
                ply_float(element.get("ny"), "ny", path),
                ply_float(element.get("nz"), "nz", path),
            ) {
                vertex.normal = Some(Vector3::new(nx, ny, nz));
            }
            if let (Some(r), Some(g), Some(b)) = (
                ply_u8(element.get("red")),
                ply_u8(element.get("green")),
                ply_u8(element.get("blue")),
            ) {
                vertex.color = Some(VertexColor::new(r, g, b));
            }
            mesh.vertices.push(vertex);
        }
    }

    if let Some(faces) = ply.payload.get("face") {
        for element in faces {
            let list = element
                .get("vertex_indices")
                .or_else(|| element.get("vertex_index"))
                .and_then(ply_index_list);
            match list {
                Some(face) if face.len() >= 3 => mesh.faces.push(face),
                Some(_) => debug!("PLY face with fewer than 3 corners skipped"),
                None => {
                    return Err(PrintError::parse_error(
                        path,
                        "face element without a vertex index list",
                    ));
                }
            }
        }
    }

    debug!(
        "PLY loaded: {} vertices, {} faces",
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

fn ply_float(prop: Option<&ply_rs::ply::Property>, name: &str, path: &Path) -> PrintResult<f64> {
    use ply_rs::ply::Property;

    match prop {
        Some(Property::Float(v)) => Ok(*v as f64),
        Some(Property::Double(v)) => Ok(*v),
        Some(Property::Int(v)) => Ok(*v as f64),
        Some(Property::UInt(v)) => Ok(*v as f64),
        Some(Property::Short(v)) => Ok(*v as f64),
        Some(Property::UShort(v)) => Ok(*v as f64),
        Some(Property::Char(v)) => Ok(*v as f64),
        Some(Property::UChar(v)) => Ok(*v as f64),
        _ => Err(PrintError::parse_error(
            path,
            format!("missing or invalid PLY property: {}", name),
        )),
    }
}

fn ply_u8(prop: Option<&ply_rs::ply::Property>) -> Option<u8> {
    use ply_rs::ply::Property;

    match prop {
        Some(Property::UChar(v)) => Some(*v),
        Some(Property::Char(v)) => Some((*v).max(0) as u8),
        Some(Property::UShort(v)) => Some((*v).min(255) as u8),
        Some(Property::Short(v)) => Some((*v).clamp(0, 255) as u8),
        Some(Property::UInt(v)) => Some((*v).min(255) as u8),
        Some(Property::Int(v)) => Some((*v).clamp(0, 255) as u8),
        Some(Property::Float(v)) => Some((v * 255.0).clamp(0.0, 255.0) as u8),
        Some(Property::Double(v)) => Some((v * 255.0).clamp(0.0, 255.0) as u8),
        _ => None,
    }
}

fn ply_index_list(prop: &ply_rs::ply::Property) -> Option<Vec<u32>> {
    use ply_rs::ply::Property;

    match prop {
        Property::ListInt(v) => Some(v.iter().map(|&i| i as u32).collect()),
        Property::ListUInt(v) => Some(v.clone()),
        Property::ListShort(v) => Some(v.iter().map(|&i| i as u32).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&i| i as u32).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&i| i as u32).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&i| i as u32).collect()),
        _ => None,
    }
}

/// Which optional vertex layers a writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataLayers {
    pub normals: bool,
    pub colors: bool,
}

impl DataLayers {
    /// Layers actually present on the mesh.
    pub fn of(mesh: &Mesh) -> Self {
        Self {
            normals: mesh.vertices.iter().any(|v| v.normal.is_some()),
            colors: mesh.vertices.iter().any(|v| v.color.is_some()),
        }
    }
}

/// Save mesh to file, auto-detecting format from extension. Layers present
/// on the mesh are written where the format supports them.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> PrintResult<()> {
    let format = MeshFormat::from_path(path)
        .ok_or_else(|| PrintError::unsupported_format(extension_of(path)))?;
    save_mesh_as(mesh, path, format, DataLayers::of(mesh))
}

fn save_mesh_as(mesh: &Mesh, path: &Path, format: MeshFormat, layers: DataLayers) -> PrintResult<()> {
    info!("Saving mesh to {:?} ({} format)", path, format.name());
    let file = File::create(path).map_err(|e| PrintError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let written = match format {
        MeshFormat::Stl => write_stl(mesh, &mut writer),
        MeshFormat::Obj => write_obj(mesh, layers, &mut writer),
        MeshFormat::Ply => write_ply_ascii(mesh, layers, &mut writer),
        MeshFormat::X3d => write_x3d(mesh, layers, &mut writer),
    };
    written
        .and_then(|_| writer.flush())
        .map_err(|e| PrintError::io_write(path, e))?;

    log_io_operation("save", path, format.name());
    Ok(())
}

/// Binary STL, polygons triangulated.
pub fn write_stl<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    let triangulated = mesh.triangulated();
    let triangles: Vec<stl_io::Triangle> = triangulated
        .mesh
        .triangles()
        .map(|t| {
            let n = t.normal().unwrap_or_else(Vector3::zeros);
            let [v0, v1, v2] = t.vertices();
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([v0.x as f32, v0.y as f32, v0.z as f32]),
                    stl_io::Vertex::new([v1.x as f32, v1.y as f32, v1.z as f32]),
                    stl_io::Vertex::new([v2.x as f32, v2.y as f32, v2.z as f32]),
                ],
            }
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())
}

/// ASCII OBJ with polygon faces and, optionally, per-vertex normals.
pub fn write_obj<W: Write>(mesh: &Mesh, layers: DataLayers, w: &mut W) -> std::io::Result<()> {
    writeln!(w, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(w, "# Faces: {}", mesh.faces.len())?;

    for v in &mesh.vertices {
        let p = v.position;
        writeln!(w, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
    }
    if layers.normals {
        for v in &mesh.vertices {
            let n = v.normal.unwrap_or_else(Vector3::zeros);
            writeln!(w, "vn {:.6} {:.6} {:.6}", n.x, n.y, n.z)?;
        }
    }
    for face in &mesh.faces {
        write!(w, "f")?;
        for &i in face {
            // OBJ uses 1-based indexing
            if layers.normals {
                write!(w, " {}//{}", i + 1, i + 1)?;
            } else {
                write!(w, " {}", i + 1)?;
            }
        }
        writeln!(w)?;
    }
    for [a, b] in &mesh.loose_edges {
        writeln!(w, "l {} {}", a + 1, b + 1)?;
    }
    Ok(())
}

/// ASCII PLY with polygon faces and optional normals and colors.
pub fn write_ply_ascii<W: Write>(mesh: &Mesh, layers: DataLayers, w: &mut W) -> std::io::Result<()> {
    use ply_rs::ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    };
    use ply_rs::writer::Writer;

    let scalar = |name: &str, ty: ScalarType| PropertyDef::new(name.to_string(), PropertyType::Scalar(ty));

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(scalar(axis, ScalarType::Float));
    }
    if layers.normals {
        for axis in ["nx", "ny", "nz"] {
            vertex_def.properties.add(scalar(axis, ScalarType::Float));
        }
    }
    if layers.colors {
        for channel in ["red", "green", "blue"] {
            vertex_def.properties.add(scalar(channel, ScalarType::UChar));
        }
    }
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    ply.header.elements.add(face_def);

    let mut vertices = Vec::with_capacity(mesh.vertices.len());
    for v in &mesh.vertices {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Float(v.position.x as f32));
        element.insert("y".to_string(), Property::Float(v.position.y as f32));
        element.insert("z".to_string(), Property::Float(v.position.z as f32));
        if layers.normals {
            let n = v.normal.unwrap_or_else(Vector3::zeros);
            element.insert("nx".to_string(), Property::Float(n.x as f32));
            element.insert("ny".to_string(), Property::Float(n.y as f32));
            element.insert("nz".to_string(), Property::Float(n.z as f32));
        }
        if layers.colors {
            let c = v.color.unwrap_or(VertexColor::new(255, 255, 255));
            element.insert("red".to_string(), Property::UChar(c.r));
            element.insert("green".to_string(), Property::UChar(c.g));
            element.insert("blue".to_string(), Property::UChar(c.b));
        }
        vertices.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertices);

    let faces = mesh
        .faces
        .iter()
        .map(|face| {
            let mut element = DefaultElement::new();
            element.insert(
                "vertex_indices".to_string(),
                Property::ListInt(face.iter().map(|&i| i as i32).collect()),
            );
            element
        })
        .collect();
    ply.payload.insert("face".to_string(), faces);

    // header counts must match the payload
    ply.make_consistent().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("PLY consistency error: {:?}", e))
    })?;
    Writer::new().write_ply(w, &mut ply)?;
    Ok(())
}

/// X3D document with one `IndexedFaceSet`.
pub fn write_x3d<W: Write>(mesh: &Mesh, layers: DataLayers, w: &mut W) -> std::io::Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<X3D version="3.0" profile="Immersive">"#)?;
    writeln!(w, "  <Scene>")?;
    writeln!(w, "    <Shape>")?;

    let coord_index = mesh
        .faces
        .iter()
        .map(|f| {
            let mut s: Vec<String> = f.iter().map(|i| i.to_string()).collect();
            s.push("-1".into());
            s.join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ");
    write!(w, r#"      <IndexedFaceSet solid="true" coordIndex="{}""#, coord_index)?;
    if layers.normals {
        write!(w, r#" normalPerVertex="true""#)?;
    }
    if layers.colors {
        write!(w, r#" colorPerVertex="true""#)?;
    }
    writeln!(w, ">")?;

    let points = mesh
        .vertices
        .iter()
        .map(|v| format!("{:.6} {:.6} {:.6}", v.position.x, v.position.y, v.position.z))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(w, r#"        <Coordinate point="{}"/>"#, points)?;

    if layers.normals {
        let vectors = mesh
            .vertices
            .iter()
            .map(|v| {
                let n = v.normal.unwrap_or_else(Vector3::zeros);
                format!("{:.6} {:.6} {:.6}", n.x, n.y, n.z)
            })
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, r#"        <Normal vector="{}"/>"#, vectors)?;
    }
    if layers.colors {
        let colors = mesh
            .vertices
            .iter()
            .map(|v| {
                let (r, g, b) = v.color.unwrap_or(VertexColor::new(255, 255, 255)).to_float();
                format!("{:.3} {:.3} {:.3}", r, g, b)
            })
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, r#"        <Color color="{}"/>"#, colors)?;
    }

    writeln!(w, "      </IndexedFaceSet>")?;
    writeln!(w, "    </Shape>")?;
    writeln!(w, "  </Scene>")?;
    writeln!(w, "</X3D>")?;
    Ok(())
}

/// Result of [`export_objects`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exported {
    pub path: PathBuf,
    pub vertices: usize,
    pub faces: usize,
}

impl Exported {
    /// `Exported: {path}`.
    pub fn message(&self) -> String {
        format!("Exported: {}", self.path.display())
    }
}

/// Resolve the export directory. A leading `//` is relative to `base_dir`.
pub fn resolve_export_dir(export_path: &str, base_dir: &Path) -> PathBuf {
    match export_path.strip_prefix("//") {
        Some(rest) => base_dir.join(rest),
        None => PathBuf::from(export_path),
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`.
pub fn clean_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Join `objects` in world space and write them in the configured format.
///
/// The file is named after the object when there is exactly one, otherwise
/// `untitled`. The export directory is created when missing.
pub fn export_objects(
    objects: &[&MeshObject],
    settings: &PrintSettings,
    base_dir: &Path,
) -> PrintResult<Exported> {
    if objects.is_empty() {
        return Err(PrintError::empty_mesh("no objects to export"));
    }

    let mut mesh = Mesh::new();
    for object in objects {
        mesh.append(&object.world_mesh());
    }

    let units = &settings.units;
    if settings.use_apply_scale && units.system != UnitSystem::None && units.scale_length != 1.0 {
        debug!(scale = units.scale_length, "applying unit scale on export");
        mesh.scale(units.scale_length);
    }

    let layers = if settings.use_data_layers {
        mesh.compute_vertex_normals();
        DataLayers {
            normals: true,
            colors: mesh.vertices.iter().any(|v| v.color.is_some()),
        }
    } else {
        DataLayers::default()
    };
    if settings.use_export_texture {
        debug!("texture export requested, meshes carry no textures");
    }

    let stem = match objects {
        [single] => clean_name(&single.name),
        _ => "untitled".to_string(),
    };
    let dir = resolve_export_dir(&settings.export_path, base_dir);
    std::fs::create_dir_all(&dir).map_err(|e| PrintError::io_write(&dir, e))?;
    let path = dir.join(format!("{}.{}", stem, settings.export_format.extension()));

    save_mesh_as(&mesh, &path, settings.export_format.mesh_format(), layers)?;
    let exported = Exported {
        path,
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
    };
    info!("{}", exported.message());
    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;
    use nalgebra::Point3;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_stl() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".stl").unwrap();
        writeln!(file, "solid test").unwrap();
        writeln!(file, "  facet normal 0 0 1").unwrap();
        writeln!(file, "    outer loop").unwrap();
        writeln!(file, "      vertex 0 0 0").unwrap();
        writeln!(file, "      vertex 10 0 0").unwrap();
        writeln!(file, "      vertex 0 10 0").unwrap();
        writeln!(file, "    endloop").unwrap();
        writeln!(file, "  endfacet").unwrap();
        writeln!(file, "endsolid test").unwrap();
        file
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(MeshFormat::from_path(Path::new("a.STL")), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_path(Path::new("a.obj")), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_path(Path::new("a.ply")), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_path(Path::new("a.x3d")), Some(MeshFormat::X3d));
        assert_eq!(MeshFormat::from_path(Path::new("a.3mf")), None);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("x3d".parse::<ExportFormat>().unwrap(), ExportFormat::X3d);
        assert_eq!("OBJ".parse::<ExportFormat>().unwrap(), ExportFormat::Obj);
        assert!("fbx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_load_ascii_stl() {
        let file = create_test_stl();
        let mesh = load_mesh(file.path()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_stl_round_trip_triangulates() {
        let file = NamedTempFile::with_suffix(".stl").unwrap();
        save_mesh(&make_unit_cube(), file.path()).unwrap();
        let mesh = load_mesh(file.path()).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_obj_keeps_polygons() {
        let file = NamedTempFile::with_suffix(".obj").unwrap();
        save_mesh(&make_unit_cube(), file.path()).unwrap();
        let mesh = load_mesh(file.path()).unwrap();
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertex_count(), 8);
        assert!(mesh.faces.iter().all(|f| f.len() == 4));
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ply_keeps_polygons_and_layers() {
        let mut cube = make_unit_cube();
        cube.compute_vertex_normals();
        cube.vertices[0].color = Some(VertexColor::new(255, 0, 0));

        let file = NamedTempFile::with_suffix(".ply").unwrap();
        save_mesh(&cube, file.path()).unwrap();
        let mesh = load_mesh(file.path()).unwrap();
        assert_eq!(mesh.faces, cube.faces);
        assert_eq!(mesh.vertices[0].color, Some(VertexColor::new(255, 0, 0)));
        assert_eq!(mesh.vertices[1].color, Some(VertexColor::new(255, 255, 255)));
        let n = mesh.vertices[6].normal.unwrap();
        assert!((n - Vector3::new(1.0, 1.0, 1.0).normalize()).norm() < 1e-6);
    }

    #[test]
    fn test_load_rejects_bad_index() {
        let mut file = NamedTempFile::with_suffix(".obj").unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert!(load_mesh(file.path()).is_ok());

        let mut mesh = Mesh::from_parts(&[[0.0, 0.0, 0.0]], vec![vec![0, 1, 2]]);
        assert!(matches!(
            validate_mesh_data(&mesh),
            Err(PrintError::InvalidVertexIndex { vertex_index: 1, .. })
        ));
        mesh.faces.clear();
        mesh.vertices[0].position.x = f64::NAN;
        assert!(matches!(
            validate_mesh_data(&mesh),
            Err(PrintError::InvalidCoordinate { coordinate: "x", .. })
        ));
    }

    #[test]
    fn test_load_unsupported() {
        let err = load_mesh(Path::new("model.x3d")).unwrap_err();
        assert!(matches!(err, PrintError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_write_x3d() {
        let mut out = Vec::new();
        write_x3d(&make_unit_cube(), DataLayers::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#"coordIndex="0 3 2 1 -1 4 5 6 7 -1"#));
        assert!(text.contains("<Coordinate point=\"0.000000 0.000000 0.000000, "));
        assert!(!text.contains("<Normal"));
    }

    #[test]
    fn test_resolve_export_dir() {
        let base = Path::new("/models");
        assert_eq!(resolve_export_dir("//", base), PathBuf::from("/models/"));
        assert_eq!(resolve_export_dir("//out", base), PathBuf::from("/models/out"));
        assert_eq!(resolve_export_dir("/tmp/x", base), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("Cube.001"), "Cube_001");
        assert_eq!(clean_name("my part"), "my_part");
        assert_eq!(clean_name(""), "untitled");
    }

    #[test]
    fn test_export_objects() {
        let dir = TempDir::new().unwrap();
        let mut object = MeshObject::new("Cube.001", make_unit_cube());
        object.location = Vector3::new(0.0, 0.0, 2.0);

        let settings = PrintSettings {
            export_format: ExportFormat::Obj,
            export_path: "//out".into(),
            ..Default::default()
        };
        let exported = export_objects(&[&object], &settings, dir.path()).unwrap();
        assert_eq!(exported.path, dir.path().join("out").join("Cube_001.obj"));
        assert_eq!(exported.message(), format!("Exported: {}", exported.path.display()));

        let reloaded = load_mesh(&exported.path).unwrap();
        let (min, _) = reloaded.bounds().unwrap();
        assert_eq!(min.z, 2.0);
    }

    #[test]
    fn test_export_joins_and_scales() {
        let dir = TempDir::new().unwrap();
        let a = MeshObject::new("a", make_unit_cube());
        let mut b = MeshObject::new("b", make_unit_cube());
        b.location = Vector3::new(3.0, 0.0, 0.0);

        let mut settings = PrintSettings {
            export_path: dir.path().to_string_lossy().into_owned(),
            use_apply_scale: true,
            ..Default::default()
        };
        settings.units.system = UnitSystem::Metric;
        settings.units.scale_length = 10.0;

        let exported = export_objects(&[&a, &b], &settings, Path::new("/unused")).unwrap();
        assert_eq!(exported.path, dir.path().join("untitled.stl"));
        let mesh = load_mesh(&exported.path).unwrap();
        let (_, max) = mesh.bounds().unwrap();
        assert!((max.x - 40.0).abs() < 1e-4);
        assert!((mesh.signed_volume() - 2000.0).abs() < 1e-2);
    }

    #[test]
    fn test_export_nothing_fails() {
        let dir = TempDir::new().unwrap();
        let err = export_objects(&[], &PrintSettings::default(), dir.path()).unwrap_err();
        assert!(matches!(err, PrintError::EmptyMesh { .. }));
    }
}
