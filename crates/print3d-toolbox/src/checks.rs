//! Printability checks.
//!
//! Every predicate is read-only and returns the indices it flags, in
//! ascending order. The `report_*` builders wrap a predicate into the
//! report entries shown to the user.
//!
//! Topology checks (solid, intersections, degenerate) run on the local
//! mesh; the geometric ones run on the object in world space so non-uniform
//! scale and rotation are taken into account.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::adjacency::{EdgeTable, TopologyKey};
use crate::bvh::TriangleBvh;
use crate::error::PrintError;
use crate::measure::{angle_or, face_angle_signed, face_is_distorted};
use crate::notice::Notice;
use crate::object::{MeshObject, Scene};
use crate::report::{ElementKind, Report, ReportEntry};
use crate::settings::PrintSettings;
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// Ray offset used by the thickness rays.
const THICK_EPSILON: f64 = 1e-4;

/// Notice emitted when checks are run with several objects selected.
pub const MULTIPLE_SELECTED: &str =
    "Multiple selected objects. Only the active one will be evaluated";

/// The individual checks, in the order [`check_all`] runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Solid,
    Intersect,
    Degenerate,
    Distorted,
    Thick,
    Sharp,
    Overhang,
}

impl CheckKind {
    pub const ALL: [CheckKind; 7] = [
        CheckKind::Solid,
        CheckKind::Intersect,
        CheckKind::Degenerate,
        CheckKind::Distorted,
        CheckKind::Thick,
        CheckKind::Sharp,
        CheckKind::Overhang,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Solid => "solid",
            CheckKind::Intersect => "intersect",
            CheckKind::Degenerate => "degenerate",
            CheckKind::Distorted => "distorted",
            CheckKind::Thick => "thick",
            CheckKind::Sharp => "sharp",
            CheckKind::Overhang => "overhang",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckKind {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PrintError::invalid_argument("check", format!("unknown check '{}'", s)))
    }
}

/// Edges flagged by the solid check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolidDefects {
    /// Edges not bordered by exactly two faces.
    pub non_manifold: Vec<usize>,
    /// Manifold edges whose faces disagree on winding.
    pub non_contiguous: Vec<usize>,
}

/// Elements flagged by the degenerate check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegenerateDefects {
    pub faces: Vec<usize>,
    pub edges: Vec<usize>,
}

pub fn check_solid(mesh: &Mesh, table: &EdgeTable) -> SolidDefects {
    let mut defects = SolidDefects::default();
    for idx in 0..table.edge_count() {
        if !table.is_manifold(idx) {
            defects.non_manifold.push(idx);
        } else if !table.is_contiguous(idx, mesh) {
            defects.non_contiguous.push(idx);
        }
    }
    defects
}

/// Faces that intersect another face of the same mesh.
pub fn check_intersections(mesh: &Mesh) -> Vec<usize> {
    let tri = mesh.triangulated();
    let bvh = TriangleBvh::from_mesh(&tri.mesh);
    let faces: BTreeSet<usize> = bvh
        .self_overlap()
        .into_iter()
        .flat_map(|(a, b)| [tri.face_map[a], tri.face_map[b]])
        .collect();
    faces.into_iter().collect()
}

pub fn check_degenerate(mesh: &Mesh, table: &EdgeTable, threshold: f64) -> DegenerateDefects {
    let faces = (0..mesh.face_count())
        .into_par_iter()
        .filter(|&f| mesh.face_area(f) <= threshold)
        .collect();
    let edges = (0..table.edge_count())
        .filter(|&e| table.edge_length(e, mesh) <= threshold)
        .collect();
    DegenerateDefects { faces, edges }
}

/// Faces whose corners leave the face plane by more than `angle` radians.
pub fn check_distorted(mesh: &Mesh, angle: f64) -> Vec<usize> {
    (0..mesh.face_count())
        .into_par_iter()
        .filter(|&f| face_is_distorted(mesh, f, angle))
        .collect()
}

/// Faces with another part of the mesh closer than `thickness` behind them.
///
/// Each triangle casts rays inwards from its corners and centroid; a hit flags
/// both the probing face and the face that was hit. Thicknesses at or below
/// the ray offset are not checked.
pub fn check_thick(mesh: &Mesh, thickness: f64) -> Vec<usize> {
    if thickness <= THICK_EPSILON {
        debug!(thickness, "thickness below ray offset, skipping");
        return Vec::new();
    }
    let tri = mesh.triangulated();
    let bvh = TriangleBvh::from_mesh(&tri.mesh);
    let reach = thickness - THICK_EPSILON;

    let pairs: Vec<(usize, usize)> = (0..bvh.len())
        .into_par_iter()
        .flat_map_iter(|t| {
            let triangle = bvh.triangle(t);
            let source = tri.face_map[t];
            let mut hits = Vec::new();
            if let Some(normal) = triangle.normal() {
                let [a, b, c] = triangle.vertices();
                for p in [a, b, c, triangle.centroid()] {
                    let origin = p - normal * THICK_EPSILON;
                    if let Some(hit) = bvh.ray_cast(&origin, &-normal, reach, Some(t)) {
                        let other = tri.face_map[hit.triangle];
                        if other != source {
                            hits.push((source, other));
                        }
                    }
                }
            }
            hits
        })
        .collect();

    let faces: BTreeSet<usize> = pairs.into_iter().flat_map(|(a, b)| [a, b]).collect();
    faces.into_iter().collect()
}

/// Manifold edges whose signed face angle exceeds `angle` radians.
pub fn check_sharp(mesh: &Mesh, table: &EdgeTable, angle: f64) -> Vec<usize> {
    (0..table.edge_count())
        .into_par_iter()
        .filter(|&e| face_angle_signed(mesh, table, e).is_some_and(|a| a > angle))
        .collect()
}

/// Downward angle below which faces need support, or `None` when the
/// overhang setting disables the check.
pub fn overhang_threshold(angle_overhang: f64) -> Option<f64> {
    let threshold = FRAC_PI_2 - angle_overhang;
    (threshold > 0.0 && threshold < PI).then_some(threshold)
}

/// Faces whose normal is within `threshold` radians of straight down.
pub fn check_overhang(mesh: &Mesh, threshold: f64) -> Vec<usize> {
    let down = -nalgebra::Vector3::z();
    (0..mesh.face_count())
        .into_par_iter()
        .filter(|&f| angle_or(&down, &mesh.face_normal_unnormalized(f), 4.0) < threshold)
        .collect()
}

fn entry(message: String, kind: ElementKind, indices: Vec<usize>, key: TopologyKey) -> ReportEntry {
    ReportEntry::with_elements(message, kind, indices, key)
}

pub fn report_solid(object: &MeshObject) -> Vec<ReportEntry> {
    let mesh = &object.mesh;
    let key = TopologyKey::of(mesh);
    let defects = check_solid(mesh, &EdgeTable::build(mesh));
    vec![
        entry(
            format!("Non Manifold Edges: {}", defects.non_manifold.len()),
            ElementKind::Edge,
            defects.non_manifold,
            key,
        ),
        entry(
            format!("Bad Contiguous Edges: {}", defects.non_contiguous.len()),
            ElementKind::Edge,
            defects.non_contiguous,
            key,
        ),
    ]
}

pub fn report_intersections(object: &MeshObject) -> Vec<ReportEntry> {
    let faces = check_intersections(&object.mesh);
    vec![entry(
        format!("Intersect Face: {}", faces.len()),
        ElementKind::Face,
        faces,
        TopologyKey::of(&object.mesh),
    )]
}

pub fn report_degenerate(object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let mesh = &object.mesh;
    let key = TopologyKey::of(mesh);
    let defects = check_degenerate(mesh, &EdgeTable::build(mesh), settings.threshold_zero);
    vec![
        entry(
            format!("Zero Faces: {}", defects.faces.len()),
            ElementKind::Face,
            defects.faces,
            key,
        ),
        entry(
            format!("Zero Edges: {}", defects.edges.len()),
            ElementKind::Edge,
            defects.edges,
            key,
        ),
    ]
}

pub fn report_distorted(object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let faces = check_distorted(&object.world_mesh(), settings.angle_distort_rad());
    vec![entry(
        format!("Non-Flat Faces: {}", faces.len()),
        ElementKind::Face,
        faces,
        TopologyKey::of(&object.mesh),
    )]
}

pub fn report_thick(object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let faces = check_thick(&object.world_mesh(), settings.thickness_min);
    vec![entry(
        format!("Thin Faces: {}", faces.len()),
        ElementKind::Face,
        faces,
        TopologyKey::of(&object.mesh),
    )]
}

pub fn report_sharp(object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let world = object.world_mesh();
    let edges = check_sharp(&world, &EdgeTable::build(&world), settings.angle_sharp_rad());
    vec![entry(
        format!("Sharp Edge: {}", edges.len()),
        ElementKind::Edge,
        edges,
        TopologyKey::of(&object.mesh),
    )]
}

pub fn report_overhang(object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let Some(threshold) = overhang_threshold(settings.angle_overhang_rad()) else {
        return vec![ReportEntry::text("Skipping Overhang")];
    };
    let faces = check_overhang(&object.world_mesh(), threshold);
    vec![entry(
        format!("Overhang Face: {}", faces.len()),
        ElementKind::Face,
        faces,
        TopologyKey::of(&object.mesh),
    )]
}

/// Run one check against an object.
pub fn run_check(kind: CheckKind, object: &MeshObject, settings: &PrintSettings) -> Vec<ReportEntry> {
    let _timer = OperationTimer::with_mesh("check", &object.mesh);
    let entries = match kind {
        CheckKind::Solid => report_solid(object),
        CheckKind::Intersect => report_intersections(object),
        CheckKind::Degenerate => report_degenerate(object, settings),
        CheckKind::Distorted => report_distorted(object, settings),
        CheckKind::Thick => report_thick(object, settings),
        CheckKind::Sharp => report_sharp(object, settings),
        CheckKind::Overhang => report_overhang(object, settings),
    };
    debug!(check = %kind, entries = entries.len(), "check complete");
    entries
}

/// Run `kinds` in order against one object.
pub fn check_object(object: &MeshObject, kinds: &[CheckKind], settings: &PrintSettings) -> Report {
    let mut report = Report::new(object.name.clone());
    for &kind in kinds {
        for e in run_check(kind, object, settings) {
            report.push(e);
        }
    }
    info!(
        object = %object.name,
        entries = report.entries.len(),
        flagged = report.flagged_count(),
        "checks complete"
    );
    report
}

/// Every check, in order.
pub fn check_all(object: &MeshObject, settings: &PrintSettings) -> Report {
    check_object(object, &CheckKind::ALL, settings)
}

/// Run checks against the active object of a scene.
///
/// The returned report replaces any earlier one.
pub fn run_checks(scene: &Scene, kinds: &[CheckKind], settings: &PrintSettings) -> (Report, Vec<Notice>) {
    let mut notices = Vec::new();
    let Some(active) = scene.active_object() else {
        notices.push(Notice::warning("No active object"));
        return (Report::default(), notices);
    };
    if scene.selected.len() > 1 {
        notices.push(Notice::info(MULTIPLE_SELECTED));
    }
    (check_object(active, kinds, settings), notices)
}

/// `Volume: {v}³` entry for the object in world space.
pub fn info_volume(object: &MeshObject, settings: &PrintSettings) -> Report {
    let volume = object.world_mesh().triangulated().mesh.volume();
    let mut report = Report::new(object.name.clone());
    report.push(ReportEntry::text(format!(
        "Volume: {}³",
        settings.units.format_volume(volume)
    )));
    report
}

/// `Area: {a}²` entry for the object in world space.
pub fn info_area(object: &MeshObject, settings: &PrintSettings) -> Report {
    let area = object.world_mesh().surface_area();
    let mut report = Report::new(object.name.clone());
    report.push(ReportEntry::text(format!(
        "Area: {}²",
        settings.units.format_area(area)
    )));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;
    use nalgebra::Vector3;

    fn cube_object() -> MeshObject {
        MeshObject::new("cube", make_unit_cube())
    }

    #[test]
    fn test_clean_cube_has_no_topology_defects() {
        let cube = make_unit_cube();
        let table = EdgeTable::build(&cube);
        assert_eq!(check_solid(&cube, &table), SolidDefects::default());
        assert!(check_intersections(&cube).is_empty());
        assert_eq!(check_degenerate(&cube, &table, 1e-4), DegenerateDefects::default());
        assert!(check_distorted(&cube, 45f64.to_radians()).is_empty());
        assert!(check_sharp(&cube, &table, 160f64.to_radians()).is_empty());
    }

    #[test]
    fn test_open_mesh_is_non_manifold() {
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        let defects = check_solid(&cube, &EdgeTable::build(&cube));
        assert_eq!(defects.non_manifold.len(), 4);
        assert!(defects.non_contiguous.is_empty());
    }

    #[test]
    fn test_flipped_face_is_not_contiguous() {
        let mut cube = make_unit_cube();
        crate::types::flip_polygon(&mut cube.faces[2]);
        let defects = check_solid(&cube, &EdgeTable::build(&cube));
        assert!(defects.non_manifold.is_empty());
        assert_eq!(defects.non_contiguous.len(), 4);
    }

    #[test]
    fn test_crossing_cubes_intersect() {
        let mut mesh = make_unit_cube();
        let mut other = make_unit_cube();
        other.translate(Vector3::new(0.5, 0.5, 0.5));
        mesh.append(&other);
        let faces = check_intersections(&mesh);
        assert!(!faces.is_empty());
        assert!(faces.windows(2).all(|w| w[0] < w[1]));
        // one face from each cube at least
        assert!(faces.iter().any(|&f| f < 6));
        assert!(faces.iter().any(|&f| f >= 6));
    }

    #[test]
    fn test_degenerate_face_and_edge() {
        let mut mesh = make_unit_cube();
        mesh.vertices.push(crate::types::Vertex::from_coords(2.0, 0.0, 0.0));
        mesh.vertices.push(crate::types::Vertex::from_coords(2.00001, 0.0, 0.0));
        mesh.vertices.push(crate::types::Vertex::from_coords(3.0, 0.0, 0.0));
        mesh.faces.push(vec![8, 9, 10]);
        let table = EdgeTable::build(&mesh);
        let defects = check_degenerate(&mesh, &table, 1e-4);
        assert_eq!(defects.faces, vec![6]);
        assert_eq!(defects.edges, vec![table.find(8, 9).unwrap()]);
    }

    #[test]
    fn test_thin_slab_is_flagged() {
        let mut slab = make_unit_cube();
        for v in &mut slab.vertices {
            v.position.z *= 0.0005;
        }
        let faces = check_thick(&slab, 0.001);
        assert!(faces.contains(&0));
        assert!(faces.contains(&1));
        assert!(check_thick(&make_unit_cube(), 0.001).is_empty());
        assert!(check_thick(&slab, 1e-5).is_empty());
    }

    #[test]
    fn test_sharp_edges_of_a_wedge() {
        // Thin wedge: the ridge edge folds by far more than 160 degrees
        let mesh = Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.05],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 1.0, 0.05],
            ],
            vec![
                vec![0, 1, 2],
                vec![3, 5, 4],
                vec![0, 3, 4, 1],
                vec![1, 4, 5, 2],
                vec![0, 2, 5, 3],
            ],
        );
        let table = EdgeTable::build(&mesh);
        let sharp = check_sharp(&mesh, &table, 160f64.to_radians());
        assert!(sharp.contains(&table.find(0, 3).unwrap()));
        assert!(!sharp.contains(&table.find(1, 4).unwrap()));
    }

    #[test]
    fn test_overhang_bottom_face() {
        let cube = make_unit_cube();
        let threshold = overhang_threshold(45f64.to_radians()).unwrap();
        assert_eq!(check_overhang(&cube, threshold), vec![0]);
    }

    #[test]
    fn test_overhang_skipped_at_ninety_degrees() {
        assert!(overhang_threshold(FRAC_PI_2).is_none());
        let settings = PrintSettings {
            angle_overhang: 90.0,
            ..PrintSettings::default()
        };
        let entries = report_overhang(&cube_object(), &settings);
        assert_eq!(entries, vec![ReportEntry::text("Skipping Overhang")]);
    }

    #[test]
    fn test_world_space_checks_follow_rotation() {
        let mut obj = cube_object();
        // upside down: the top face now points down
        obj.rotation = nalgebra::UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        let entries = report_overhang(&obj, &PrintSettings::default());
        let sel = entries[0].selector.as_ref().unwrap();
        assert_eq!(sel.indices, vec![1]);
    }

    #[test]
    fn test_check_all_order() {
        let report = check_all(&cube_object(), &PrintSettings::default());
        let messages: Vec<&str> = report.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Non Manifold Edges: 0",
                "Bad Contiguous Edges: 0",
                "Intersect Face: 0",
                "Zero Faces: 0",
                "Zero Edges: 0",
                "Non-Flat Faces: 0",
                "Thin Faces: 0",
                "Sharp Edge: 0",
                "Overhang Face: 1",
            ]
        );
    }

    #[test]
    fn test_run_checks_only_active() {
        let mut scene = Scene::new(vec![cube_object()]);
        let (_, notices) = run_checks(&scene, &[CheckKind::Solid], &PrintSettings::default());
        assert!(notices.is_empty());

        scene.add_object(MeshObject::new("empty", Mesh::new()));
        let (report, notices) = run_checks(&scene, &[CheckKind::Solid], &PrintSettings::default());
        assert_eq!(notices, vec![Notice::info(MULTIPLE_SELECTED)]);
        assert_eq!(report.object.as_deref(), Some("empty"));
    }

    #[test]
    fn test_info_reports() {
        let mut obj = cube_object();
        obj.scale = Vector3::new(2.0, 2.0, 2.0);
        let settings = PrintSettings::default();
        assert_eq!(info_volume(&obj, &settings).entries[0].message, "Volume: 8.0³");
        assert_eq!(info_area(&obj, &settings).entries[0].message, "Area: 24.0²");
    }

    #[test]
    fn test_check_kind_parse() {
        assert_eq!("Sharp".parse::<CheckKind>().unwrap(), CheckKind::Sharp);
        assert!("bogus".parse::<CheckKind>().is_err());
    }
}
