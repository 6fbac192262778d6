//! Hole detection and filling.

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::adjacency::{EdgeTable, edge_direction_in_face};
use crate::types::Mesh;

/// A closed chain of boundary edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    /// Loop vertices, ordered so that a face built from them winds
    /// consistently with its neighbours.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop.
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Trace every closed boundary loop of the mesh.
///
/// Loops are walked over one-face edges regardless of how those faces wind,
/// then oriented against the majority of their neighbouring faces. A vertex
/// visited twice splits the walk, so bow-tie boundaries produce two simple
/// loops. Open chains are dropped.
pub fn boundary_loops(mesh: &Mesh, table: &EdgeTable) -> Vec<BoundaryLoop> {
    let boundary: Vec<usize> = (0..table.edge_count())
        .filter(|&e| table.is_boundary(e))
        .collect();
    if boundary.is_empty() {
        return Vec::new();
    }
    debug!(edges = boundary.len(), "boundary edges");

    let mut incident: HashMap<u32, Vec<usize>> = HashMap::new();
    for (slot, &e) in boundary.iter().enumerate() {
        let [a, b] = table.edge(e).verts;
        incident.entry(a).or_default().push(slot);
        incident.entry(b).or_default().push(slot);
    }

    let mut used = vec![false; boundary.len()];
    let mut loops: Vec<Vec<u32>> = Vec::new();

    for start in 0..boundary.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let [first, mut v] = table.edge(boundary[start]).verts;

        let mut path = vec![first];
        let mut position: HashMap<u32, usize> = HashMap::new();
        position.insert(first, 0);

        loop {
            if v == path[0] {
                loops.push(path);
                break;
            }
            if let Some(&k) = position.get(&v) {
                // pinch point: cut the inner loop off and keep walking
                let inner = path.split_off(k + 1);
                for u in &inner {
                    position.remove(u);
                }
                let mut cut = vec![v];
                cut.extend(inner);
                loops.push(cut);
            } else {
                position.insert(v, path.len());
                path.push(v);
            }

            let next = incident
                .get(&v)
                .and_then(|slots| slots.iter().copied().find(|&s| !used[s]));
            let Some(slot) = next else {
                debug!(start = path[0], "open boundary chain");
                break;
            };
            used[slot] = true;
            let [a, b] = table.edge(boundary[slot]).verts;
            v = if a == v { b } else { a };
        }
    }

    loops
        .into_iter()
        .filter(|l| l.len() >= 3)
        .map(|vertices| orient_loop(mesh, table, vertices))
        .map(|vertices| BoundaryLoop { vertices })
        .collect()
}

/// Reverse a loop when most of its edges run the same way as their face.
fn orient_loop(mesh: &Mesh, table: &EdgeTable, mut vertices: Vec<u32>) -> Vec<u32> {
    let n = vertices.len();
    let mut same = 0usize;
    for i in 0..n {
        let (a, b) = (vertices[i], vertices[(i + 1) % n]);
        let Some(edge) = table.find(a, b) else {
            continue;
        };
        if let Some(&face) = table.faces_for_edge(edge).first()
            && edge_direction_in_face(&mesh.faces[face], a, b) == Some(true)
        {
            same += 1;
        }
    }
    if same * 2 > n {
        vertices.reverse();
    }
    vertices
}

/// Close boundary loops with one polygon each.
///
/// `sides == 0` fills every loop, otherwise only loops with at most `sides`
/// edges. Returns the number of holes filled.
pub fn fill_holes(mesh: &mut Mesh, sides: usize) -> usize {
    let table = EdgeTable::build(mesh);
    let loops = boundary_loops(mesh, &table);
    let mut filled = 0;
    for hole in loops {
        if sides != 0 && hole.edge_count() > sides {
            debug!(edges = hole.edge_count(), sides, "hole too large, skipped");
            continue;
        }
        mesh.faces.push(hole.vertices);
        filled += 1;
    }
    if filled > 0 {
        info!(holes = filled, "Filled holes");
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;

    #[test]
    fn test_closed_mesh_has_no_loops() {
        let cube = make_unit_cube();
        assert!(boundary_loops(&cube, &EdgeTable::build(&cube)).is_empty());
    }

    #[test]
    fn test_fill_missing_face_restores_volume() {
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        let table = EdgeTable::build(&cube);
        let loops = boundary_loops(&cube, &table);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].edge_count(), 4);

        assert_eq!(fill_holes(&mut cube, 0), 1);
        let table = EdgeTable::build(&cube);
        assert!((0..table.edge_count()).all(|e| table.is_contiguous(e, &cube)));
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sides_limit() {
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        assert_eq!(fill_holes(&mut cube, 3), 0);
        assert_eq!(fill_holes(&mut cube, 4), 1);
    }

    #[test]
    fn test_two_holes() {
        let mut cube = make_unit_cube();
        cube.faces.remove(1);
        cube.faces.remove(0);
        assert_eq!(fill_holes(&mut cube, 0), 2);
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_open_strip_has_one_loop() {
        let mesh = Mesh::from_parts(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0]],
            vec![vec![0, 1, 2, 3], vec![1, 4, 5, 2]],
        );
        let loops = boundary_loops(&mesh, &EdgeTable::build(&mesh));
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].edge_count(), 6);
    }
}
