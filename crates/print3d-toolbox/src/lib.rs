//! Printability analysis and repair for polygon meshes.
//!
//! This crate checks meshes for problems that break 3D printing, repairs the
//! common ones, and provides the small set of transform operators used to
//! prepare a model for the printer.
//!
//! # Features
//!
//! - **Checks**: solid (non-manifold edges and flipped neighbours),
//!   self-intersections, degenerate elements, distorted polygons, thin walls,
//!   sharp edges and overhangs, collected into a [`Report`]
//! - **Repair**: the non-manifold clean pipeline (loose and interior
//!   geometry, doubles, degenerate dissolve, hole filling, normals) and
//!   triangulation of distorted faces
//! - **Transforms**: scale to a volume or to bounds, align a face selection
//!   to the XY plane, move to the origin, shrink/fatten, flat projection
//! - **File I/O**: load STL, OBJ and PLY; save STL, OBJ, PLY and X3D
//!
//! # Meshes, objects and scenes
//!
//! A [`Mesh`] is polygonal: faces are vertex loops wound counter-clockwise
//! when seen from outside, edges are implicit, and loose edges are stored
//! separately. A [`MeshObject`] places a mesh in the world with a location,
//! rotation and scale. Operators that act on "the selection" take a
//! [`Scene`], which holds objects plus selection state and a [`Mode`].
//!
//! Checks run on local coordinates except the overhang check, which needs
//! the world "down" direction.
//!
//! # Quick Start
//!
//! ```no_run
//! use print3d_toolbox::{CheckKind, Mesh, MeshObject, PrintSettings, Scene, checks};
//!
//! let mesh = Mesh::load("model.stl").unwrap();
//! let scene = Scene::new(vec![MeshObject::new("model", mesh)]);
//!
//! let settings = PrintSettings::default();
//! let (report, notices) = checks::run_checks(&scene, &CheckKind::ALL, &settings);
//! for notice in &notices {
//!     println!("{}", notice);
//! }
//! println!("{}", report);
//! ```
//!
//! # Repairing a mesh
//!
//! ```
//! use print3d_toolbox::{CleanParams, Mesh, clean_non_manifold};
//!
//! // a tetrahedron plus one stray vertex
//! let mut mesh = Mesh::from_parts(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [5.0, 5.0, 5.0]],
//!     vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
//! );
//! let outcome = clean_non_manifold(&mut mesh, &CleanParams::default());
//! assert_eq!(mesh.vertex_count(), 4);
//! println!("{}", outcome.message());
//! ```
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | STL    | `.stl`    | ✓    | ✓    | Binary and ASCII; saved triangulated |
//! | OBJ    | `.obj`    | ✓    | ✓    | Polygons kept, optional normals |
//! | PLY    | `.ply`    | ✓    | ✓    | Polygons, normals and colors |
//! | X3D    | `.x3d`    |      | ✓    | One `IndexedFaceSet` |

mod error;
mod triangulate;
mod types;

pub mod adjacency;
pub mod bvh;
pub mod checks;
pub mod cleanup;
pub mod holes;
pub mod io;
pub mod measure;
pub mod notice;
pub mod object;
pub mod repair;
pub mod report;
pub mod settings;
pub mod tracing_ext;
pub mod transform;
pub mod units;
pub mod winding;

pub use error::{ErrorCode, MeshLocation, PrintError, PrintResult, RecoverySuggestion};
pub use types::{BoundingBox, Mesh, Triangle, TriangulatedMesh, Vertex, VertexColor, flip_polygon};
pub use triangulate::triangulate_polygon;

pub use adjacency::{EdgeTable, NonManifoldSelect, TopologyKey};
pub use checks::{CheckKind, check_all, check_object, run_checks};
pub use cleanup::{delete_loose, dissolve_degenerate, remove_doubles};
pub use holes::{BoundaryLoop, boundary_loops, fill_holes};
pub use io::{ExportFormat, Exported, MeshFormat, export_objects, load_mesh, save_mesh};
pub use notice::{Notice, NoticeLevel, OperatorResult, OperatorStatus};
pub use object::{MeshObject, Mode, Scene};
pub use repair::{
    CleanOutcome, CleanParams, ElementCounts, clean_distorted, clean_non_manifold,
    fix_non_manifold,
};
pub use report::{ElementKind, Report, ReportEntry, Selection};
pub use settings::PrintSettings;
pub use tracing_ext::{OperationTimer, log_io_operation, log_mesh_stats, log_report};
pub use units::{UnitSettings, UnitSystem, clean_float};
pub use winding::normals_make_consistent;

impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> PrintResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh to a file, auto-detecting format from extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> PrintResult<()> {
        io::save_mesh(self, path.as_ref())
    }

    /// Run every check on this mesh as an untransformed object.
    pub fn check(&self, settings: &PrintSettings) -> Report {
        let object = MeshObject::new("mesh", self.clone());
        checks::check_all(&object, settings)
    }

    /// Run the non-manifold clean pipeline with default parameters.
    pub fn clean(&mut self) -> CleanOutcome {
        repair::clean_non_manifold(self, &CleanParams::default())
    }
}
