//! Repair operators: the non-manifold clean pipeline and distorted-face
//! triangulation.

use hashbrown::HashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adjacency::{EdgeTable, NonManifoldSelect, non_manifold_vertices};
use crate::cleanup::{
    delete_interior, delete_loose, delete_vertices, dissolve_degenerate, remove_doubles,
    triangulate_faces,
};
use crate::holes::fill_holes;
use crate::measure::face_is_distorted;
use crate::notice::{Notice, OperatorResult};
use crate::object::MeshObject;
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;
use crate::winding::normals_make_consistent;

/// Parameters of [`clean_non_manifold`].
///
/// # Example
///
/// ```
/// use print3d_toolbox::repair::CleanParams;
///
/// let params = CleanParams {
///     sides: 8, // only close small holes
///     ..Default::default()
/// };
/// assert_eq!(params.threshold, 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanParams {
    /// Merge distance for doubles and the degenerate dissolve.
    pub threshold: f64,
    /// Largest hole to fill, in edges. `0` fills every hole.
    pub sides: usize,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            threshold: 0.0001,
            sides: 0,
        }
    }
}

/// `(vertices, edges, faces)` counts of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ElementCounts {
    pub vertices: usize,
    pub edges: usize,
    pub faces: usize,
}

impl ElementCounts {
    pub fn of(mesh: &Mesh) -> Self {
        Self {
            vertices: mesh.vertex_count(),
            edges: EdgeTable::build(mesh).edge_count(),
            faces: mesh.face_count(),
        }
    }
}

/// How the fill-and-delete loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixLoopOutcome {
    /// Fill-and-delete rounds performed.
    pub iterations: usize,
    /// The repeated state was not the one right before it, so the loop was
    /// oscillating rather than settled.
    pub cycled: bool,
}

/// Result of [`clean_non_manifold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanOutcome {
    pub before: ElementCounts,
    pub after: ElementCounts,
    pub fix: FixLoopOutcome,
}

impl CleanOutcome {
    /// `Modified: {+v} verts, {+e} edges, {+f} faces`.
    pub fn message(&self) -> String {
        let delta = |a: usize, b: usize| b as i64 - a as i64;
        format!(
            "Modified: {:+} verts, {:+} edges, {:+} faces",
            delta(self.before.vertices, self.after.vertices),
            delta(self.before.edges, self.after.edges),
            delta(self.before.faces, self.after.faces),
        )
    }
}

fn count_non_manifold(mesh: &Mesh) -> usize {
    let table = EdgeTable::build(mesh);
    non_manifold_vertices(mesh, &table, NonManifoldSelect::ALL)
        .iter()
        .filter(|&&v| v)
        .count()
}

/// Fill holes and delete non-manifold vertices until the element counts
/// repeat.
///
/// The loop stops on the first repeated `(V, E, F)` state, which is not
/// necessarily a mesh without non-manifold geometry.
pub fn fix_non_manifold(mesh: &mut Mesh, sides: usize) -> FixLoopOutcome {
    if count_non_manifold(mesh) == 0 {
        return FixLoopOutcome {
            iterations: 0,
            cycled: false,
        };
    }

    halt_on_repeat(mesh, |mesh, iteration| fix_round(mesh, sides, iteration))
}

/// One round of the fix loop: fill holes, then delete wire and
/// non-manifold vertices.
fn fix_round(mesh: &mut Mesh, sides: usize, iteration: usize) {
    fill_holes(mesh, sides);

    let table = EdgeTable::build(mesh);
    let select = NonManifoldSelect {
        wire: true,
        boundary: false,
        verts: true,
    };
    let flagged = non_manifold_vertices(mesh, &table, select);
    let deleted = delete_vertices(mesh, &flagged);
    debug!(iteration, deleted, "non-manifold fix round");
}

/// Apply `round` until the `(V, E, F)` counts hit a state seen before.
fn halt_on_repeat(mesh: &mut Mesh, mut round: impl FnMut(&mut Mesh, usize)) -> FixLoopOutcome {
    let mut seen: HashSet<ElementCounts> = HashSet::new();
    let mut previous = ElementCounts::of(mesh);
    seen.insert(previous);
    let mut iterations = 0;

    loop {
        iterations += 1;
        round(mesh, iterations);

        let counts = ElementCounts::of(mesh);
        if !seen.insert(counts) {
            let cycled = counts != previous;
            if cycled {
                warn!(iterations, "non-manifold fix halted on a repeated earlier state");
            }
            return FixLoopOutcome { iterations, cycled };
        }
        previous = counts;
    }
}

/// Delete loose and interior geometry, merge doubles, dissolve degenerate
/// elements, fill holes, and make normals point outwards.
pub fn clean_non_manifold(mesh: &mut Mesh, params: &CleanParams) -> CleanOutcome {
    let _timer = OperationTimer::with_mesh("clean_non_manifold", mesh);
    let before = ElementCounts::of(mesh);

    delete_loose(mesh);
    delete_interior(mesh);
    remove_doubles(mesh, params.threshold);
    dissolve_degenerate(mesh, params.threshold);
    let fix = fix_non_manifold(mesh, params.sides);
    normals_make_consistent(mesh);

    let outcome = CleanOutcome {
        before,
        after: ElementCounts::of(mesh),
        fix,
    };
    info!(
        vertices = outcome.after.vertices,
        faces = outcome.after.faces,
        iterations = fix.iterations,
        "Non-manifold clean complete"
    );
    outcome
}

/// Run [`clean_non_manifold`] on an object's mesh.
pub fn clean_non_manifold_object(object: &mut MeshObject, params: &CleanParams) -> OperatorResult {
    let outcome = clean_non_manifold(&mut object.mesh, params);
    OperatorResult::finished(vec![Notice::info(outcome.message())])
}

/// Triangulate faces distorted beyond `angle` radians.
///
/// Returns the number of faces triangulated.
pub fn clean_distorted(mesh: &mut Mesh, angle: f64) -> usize {
    let distorted: Vec<usize> = (0..mesh.face_count())
        .filter(|&f| face_is_distorted(mesh, f, angle))
        .collect();
    if distorted.is_empty() {
        return 0;
    }
    triangulate_faces(mesh, &distorted);
    distorted.len()
}

/// Run [`clean_distorted`] on an object's mesh.
pub fn clean_distorted_object(object: &mut MeshObject, angle: f64) -> OperatorResult {
    let count = clean_distorted(&mut object.mesh, angle);
    OperatorResult::finished(vec![Notice::info(format!("Triangulated {} faces", count))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;
    use crate::types::{Vertex, flip_polygon};

    #[test]
    fn test_clean_cube_is_untouched() {
        let mut cube = make_unit_cube();
        let outcome = clean_non_manifold(&mut cube, &CleanParams::default());
        assert_eq!(outcome.before, outcome.after);
        assert_eq!(outcome.fix.iterations, 0);
        assert_eq!(outcome.message(), "Modified: +0 verts, +0 edges, +0 faces");
    }

    #[test]
    fn test_clean_fills_hole_and_fixes_normals() {
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        flip_polygon(&mut cube.faces[2]);
        let outcome = clean_non_manifold(&mut cube, &CleanParams::default());
        assert_eq!(outcome.after.faces, 6);
        assert_eq!(outcome.message(), "Modified: +0 verts, +0 edges, +1 faces");
        assert_eq!(count_non_manifold(&cube), 0);
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clean_object_reports_modification() {
        let mut cube = make_unit_cube();
        cube.faces.remove(3);
        let mut object = MeshObject::new("open", cube);
        let result = clean_non_manifold_object(&mut object, &CleanParams::default());
        assert!(result.is_finished());
        assert_eq!(result.notices[0].message, "Modified: +0 verts, +0 edges, +1 faces");
        assert_eq!(object.mesh.face_count(), 6);
    }

    #[test]
    fn test_clean_removes_loose_and_doubles() {
        let mut cube = make_unit_cube();
        cube.vertices.push(Vertex::from_coords(3.0, 3.0, 3.0));
        cube.vertices.push(Vertex::from_coords(1.0, 1.0, 1.00001));
        cube.faces[1] = vec![4, 5, 8 + 1, 7];
        let outcome = clean_non_manifold(&mut cube, &CleanParams::default());
        assert_eq!(outcome.after.vertices, 8);
        assert_eq!(outcome.message(), "Modified: -2 verts, -2 edges, +0 faces");
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mut mesh = make_unit_cube();
        mesh.faces.remove(0);
        mesh.loose_edges.push([0, 6]);
        clean_non_manifold(&mut mesh, &CleanParams::default());
        let first = ElementCounts::of(&mesh);
        let second = clean_non_manifold(&mut mesh, &CleanParams::default());
        assert_eq!(second.after, first);
    }

    #[test]
    fn test_fix_loop_stops_on_repeat() {
        // a hole too large for the side limit can never be closed
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        let outcome = fix_non_manifold(&mut cube, 3);
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.cycled);
        assert_eq!(cube.face_count(), 5);
    }

    #[test]
    fn test_oscillating_rounds_flag_a_cycle() {
        // A -> B -> A: the repeat is older than the previous state
        let mut cube = make_unit_cube();
        let outcome = halt_on_repeat(&mut cube, |mesh, _| {
            if mesh.vertex_count() == 8 {
                mesh.vertices.push(Vertex::from_coords(5.0, 5.0, 5.0));
            } else {
                mesh.vertices.pop();
            }
        });
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.cycled);
        assert_eq!(cube.vertex_count(), 8);
    }

    #[test]
    fn test_longer_cycle_halts_on_first_repeat() {
        // A -> B -> C -> B
        let mut cube = make_unit_cube();
        let outcome = halt_on_repeat(&mut cube, |mesh, iteration| {
            if iteration == 3 {
                mesh.vertices.pop();
            } else {
                mesh.vertices.push(Vertex::from_coords(5.0, 5.0, iteration as f64));
            }
        });
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.cycled);
        assert_eq!(cube.vertex_count(), 9);
    }

    #[test]
    fn test_settled_round_is_not_a_cycle() {
        let mut cube = make_unit_cube();
        let outcome = halt_on_repeat(&mut cube, |_, _| {});
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.cycled);
    }

    #[test]
    fn test_clean_distorted() {
        let mut cube = make_unit_cube();
        cube.vertices[6].position.z = 1.6;
        let mut object = MeshObject::new("warped", cube);
        let result = clean_distorted_object(&mut object, 10f64.to_radians());
        assert!(result.is_finished());
        // the side faces through the lifted corner stay planar
        assert_eq!(result.notices[0].message, "Triangulated 1 faces");
        assert_eq!(object.mesh.face_count(), 7);

        let result = clean_distorted_object(&mut object, 10f64.to_radians());
        assert_eq!(result.notices[0].message, "Triangulated 0 faces");
    }
}
