//! Object transform operators: scaling to a target, aligning a face
//! selection to the XY plane, placing at the origin, shrink/fatten and the
//! flat XY projection.
//!
//! Operators act on the selected objects of a [`Scene`], or on the active
//! object's mesh when the scene is in [`Mode::EditMesh`]. They return an
//! [`OperatorResult`]; warnings such as a zero volume cancel the operator
//! without touching the scene.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

use crate::cleanup::remove_doubles;
use crate::notice::{Notice, OperatorResult};
use crate::object::{MeshObject, Mode, Scene};
use crate::types::BoundingBox;
use crate::units::clean_float;

/// Merge distance used when flattening projections.
const PROJECTION_MERGE: f64 = 0.0001;

pub const NO_OBJECTS_SELECTED: &str = "No objects selected";

/// Warning for a scale target that is not a positive number.
pub const INVALID_TARGET: &str = "Target must be a positive number";

fn invalid_target(target: f64) -> Option<OperatorResult> {
    if target.is_finite() && target > 0.0 {
        return None;
    }
    warn!(target, "scale target must be positive");
    Some(OperatorResult::cancelled(Notice::warning(INVALID_TARGET)))
}

/// Uniformly scale the selection by `factor`.
///
/// Object mode scales every selected object about the median of their
/// origins; edit mode scales the active mesh about its vertex median.
fn resize(scene: &mut Scene, factor: f64) {
    if factor == 1.0 {
        return;
    }
    match scene.mode {
        Mode::EditMesh => {
            if let Some(object) = scene.active_object_mut() {
                let mesh = &mut object.mesh;
                let n = mesh.vertex_count().max(1) as f64;
                let median = mesh
                    .vertices
                    .iter()
                    .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                    / n;
                for v in &mut mesh.vertices {
                    v.position = Point3::from(median + (v.position.coords - median) * factor);
                }
            }
        }
        Mode::Object => {
            let selected = scene.selected.clone();
            let count = selected.len().max(1) as f64;
            let pivot = selected
                .iter()
                .filter_map(|&i| scene.objects.get(i))
                .fold(Vector3::zeros(), |acc, o| acc + o.location)
                / count;
            for i in selected {
                if let Some(object) = scene.objects.get_mut(i) {
                    object.location = pivot + (object.location - pivot) * factor;
                    object.scale *= factor;
                }
            }
        }
    }
}

fn scaled_by(factor: f64, suffix: &str) -> Notice {
    Notice::info(format!("Scaled by {}{}", clean_float(factor, 6), suffix))
}

/// Signed world volume of the edit mesh, or summed over the selection.
pub fn selection_volume(scene: &Scene) -> f64 {
    match scene.mode {
        Mode::EditMesh => scene
            .active_object()
            .map(|o| o.world_mesh().signed_volume())
            .unwrap_or(0.0),
        Mode::Object => scene
            .selected_objects()
            .map(|o| o.world_mesh().signed_volume())
            .sum(),
    }
}

/// Largest world extent of the selection and the axis it lies along.
pub fn selection_extent(scene: &Scene) -> Option<(f64, usize)> {
    let boxes: Vec<BoundingBox> = match scene.mode {
        Mode::EditMesh => scene.active_object().and_then(|o| o.world_bounds()).into_iter().collect(),
        Mode::Object => scene.selected_objects().filter_map(|o| o.world_bounds()).collect(),
    };
    let corners: Vec<Point3<f64>> = boxes.iter().flat_map(|b| [b.min, b.max]).collect();
    let bounds = BoundingBox::from_points(&corners)?;
    let extents = bounds.extents();
    (0..3)
        .map(|axis| (extents[axis], axis))
        .max_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
}

/// Scale the selection so its volume becomes `target`.
pub fn scale_to_volume(scene: &mut Scene, target: f64) -> OperatorResult {
    if let Some(cancelled) = invalid_target(target) {
        return cancelled;
    }
    let volume = selection_volume(scene);
    if volume == 0.0 {
        warn!("selection has zero volume");
        return OperatorResult::cancelled(Notice::warning("Object has zero volume"));
    }
    let factor = target.cbrt() / volume.abs().cbrt();
    resize(scene, factor);
    info!(volume, target, factor, "Scaled to volume");
    OperatorResult::finished(vec![scaled_by(factor, "")])
}

/// Scale the selection so its largest extent becomes `target`.
pub fn scale_to_bounds(scene: &mut Scene, target: f64) -> OperatorResult {
    if let Some(cancelled) = invalid_target(target) {
        return cancelled;
    }
    let (length, axis) = selection_extent(scene).unwrap_or((0.0, 0));
    if length == 0.0 {
        warn!("selection has zero bounds");
        return OperatorResult::cancelled(Notice::warning("Object has zero bounds"));
    }
    let factor = target / length;
    resize(scene, factor);
    let axis_name = ["X", "Y", "Z"][axis];
    info!(length, target, factor, axis = axis_name, "Scaled to bounds");
    OperatorResult::finished(vec![scaled_by(
        factor,
        &format!(", Clamping {}-Axis", axis_name),
    )])
}

/// Rotate each selected object so the average normal of its selected faces
/// points straight down. Location and scale are kept. Every selected object
/// is aligned in both modes.
pub fn align_to_xy(scene: &mut Scene, use_face_area: bool) -> OperatorResult {
    let mut skipped: Vec<String> = Vec::new();
    let down = -Vector3::z();

    let targets = scene.selected.clone();
    for idx in targets {
        let Some(object) = scene.objects.get_mut(idx) else {
            continue;
        };
        if object.selected_faces.is_empty() {
            skipped.push(object.name.clone());
            continue;
        }

        let mut normal = Vector3::zeros();
        for &f in &object.selected_faces {
            if f >= object.mesh.face_count() {
                continue;
            }
            let n = object.mesh.face_normal(f).unwrap_or_else(Vector3::zeros);
            normal += if use_face_area {
                n * object.mesh.face_area(f)
            } else {
                n
            };
        }
        let Some(local) = normal.try_normalize(f64::EPSILON) else {
            debug!(object = %object.name, "selected normals cancel out, not rotating");
            continue;
        };
        let world = object.rotation * local;
        let offset = UnitQuaternion::rotation_between(&world, &down)
            .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));
        object.rotation = offset * object.rotation;
        debug!(object = %object.name, angle = offset.angle(), "aligned to XY");
    }

    let notices = match skipped.as_slice() {
        [] => Vec::new(),
        [name] => vec![Notice::warning(format!(
            "Skipping object {}. No faces selected",
            name
        ))],
        names => {
            for name in names {
                warn!(object = %name, "align to XY: no faces selected");
            }
            vec![Notice::warning("Skipping some objects. No faces selected")]
        }
    };
    OperatorResult::finished(notices)
}

/// Move every selected object to the world origin.
pub fn move_to_zero(scene: &mut Scene) -> OperatorResult {
    if scene.selected.is_empty() {
        return OperatorResult::cancelled(Notice::warning(NO_OBJECTS_SELECTED));
    }
    for &i in &scene.selected {
        if let Some(object) = scene.objects.get_mut(i) {
            object.location = Vector3::zeros();
        }
    }
    OperatorResult::finished(vec![Notice::info(format!(
        "Moved {} objects",
        scene.selected.len()
    ))])
}

/// Move each object's origin to the center of its bounds, keeping the shape
/// in place, then move the object to the world origin.
pub fn reset_origin_and_move_to_zero(scene: &mut Scene) -> OperatorResult {
    if scene.selected.is_empty() {
        return OperatorResult::cancelled(Notice::warning(NO_OBJECTS_SELECTED));
    }
    for &i in &scene.selected {
        if let Some(object) = scene.objects.get_mut(i) {
            recenter_origin(object);
            object.location = Vector3::zeros();
        }
    }
    OperatorResult::finished(vec![Notice::info(format!(
        "Moved {} objects",
        scene.selected.len()
    ))])
}

/// Shift the geometry so the origin sits at the center of its local bounds,
/// compensating the location so the world shape is unchanged.
pub fn recenter_origin(object: &mut MeshObject) {
    let Some(bounds) = object.mesh.bounding_box() else {
        return;
    };
    let center = bounds.center().coords;
    object.mesh.translate(-center);
    let world_offset = object.rotation * center.component_mul(&object.scale);
    object.location += world_offset;
}

/// Move every vertex of the selected objects along its normal by `amount`
/// world units; positive values thicken.
pub fn thin_objects(scene: &mut Scene, amount: f64) -> OperatorResult {
    if scene.selected.is_empty() {
        return OperatorResult::cancelled(Notice::warning(NO_OBJECTS_SELECTED));
    }
    let mut notices = Vec::new();
    for &i in &scene.selected {
        let Some(object) = scene.objects.get_mut(i) else {
            continue;
        };
        notices.push(Notice::info(format!("Thinning amount: {:?}", amount)));
        let matrix = object.matrix_world();
        let Some(inverse) = matrix.try_inverse() else {
            warn!(object = %object.name, "degenerate transform, skipping");
            continue;
        };
        let mut world = object.world_mesh();
        world.compute_vertex_normals();
        for (local, moved) in object.mesh.vertices.iter_mut().zip(&world.vertices) {
            if let Some(n) = moved.normal {
                local.position = inverse.transform_point(&(moved.position + n * amount));
            }
        }
    }
    OperatorResult::finished(notices)
}

/// Create a flat copy at z = 0 of every selected object.
pub fn project_to_xy(scene: &mut Scene) -> OperatorResult {
    if scene.selected.is_empty() {
        return OperatorResult::cancelled(Notice::warning(NO_OBJECTS_SELECTED));
    }
    let sources: Vec<usize> = scene.selected.clone();
    let mut created = 0;
    for i in sources {
        let Some(source) = scene.objects.get(i) else {
            continue;
        };
        let mut mesh = source.world_mesh();
        for v in &mut mesh.vertices {
            v.position.z = 0.0;
            v.normal = None;
        }
        remove_doubles(&mut mesh, PROJECTION_MERGE);
        let name = unique_name(scene, "projection");
        debug!(source = %source.name, faces = mesh.face_count(), "created projection");
        scene.objects.push(MeshObject::new(name, mesh));
        created += 1;
    }
    info!(created, "Projected objects to XY");
    OperatorResult::finished(Vec::new())
}

/// `base`, or `base.001`, `base.002`, ... when the name is taken.
pub fn unique_name(scene: &Scene, base: &str) -> String {
    if scene.find(base).is_none() {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}.{:03}", base, n))
        .find(|candidate| scene.find(candidate).is_none())
        .unwrap_or_else(|| base.to_string())
}
