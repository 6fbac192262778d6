//! Primitive mesh cleanup operators.
//!
//! These mirror the edit-mode cleanup tools: deleting loose and interior
//! geometry, merging doubles, dissolving degenerate elements and
//! triangulating selected polygons. Each returns how much it changed.

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::adjacency::EdgeTable;
use crate::measure::face_min_height;
use crate::triangulate::triangulate_polygon;
use crate::types::Mesh;

/// Delete faces sharing no edge with another face, wire edges, and
/// vertices left without any edge.
///
/// Returns the total number of removed elements.
pub fn delete_loose(mesh: &mut Mesh) -> usize {
    let table = EdgeTable::build(mesh);
    let isolated: Vec<bool> = mesh
        .faces
        .iter()
        .map(|face| {
            let n = face.len();
            (0..n).all(|i| {
                table
                    .find(face[i], face[(i + 1) % n])
                    .is_none_or(|e| table.faces_for_edge(e).len() <= 1)
            })
        })
        .collect();

    let faces_before = mesh.faces.len();
    let mut idx = 0;
    mesh.faces.retain(|_| {
        let keep = !isolated[idx];
        idx += 1;
        keep
    });
    let faces = faces_before - mesh.faces.len();
    let edges = mesh.loose_edges.len();
    mesh.loose_edges.clear();
    let verts = mesh.remove_unused_vertices();

    if faces + edges + verts > 0 {
        info!(faces, edges, verts, "Deleted loose geometry");
    }
    faces + edges + verts
}

/// Delete faces all of whose edges are shared by three or more faces.
///
/// Returns the number of faces removed.
pub fn delete_interior(mesh: &mut Mesh) -> usize {
    let table = EdgeTable::build(mesh);
    let interior: Vec<bool> = mesh
        .faces
        .iter()
        .map(|face| {
            let n = face.len();
            (0..n).all(|i| {
                table
                    .find(face[i], face[(i + 1) % n])
                    .is_some_and(|e| table.faces_for_edge(e).len() >= 3)
            })
        })
        .collect();
    let removed = delete_faces(mesh, &interior);
    if removed > 0 {
        info!(faces = removed, "Deleted interior faces");
    }
    removed
}

/// Delete flagged faces along with vertices only they used.
///
/// Returns the number of faces removed.
pub fn delete_faces(mesh: &mut Mesh, flagged: &[bool]) -> usize {
    let mut touched = vec![false; mesh.vertices.len()];
    let before = mesh.faces.len();
    let mut idx = 0;
    mesh.faces.retain(|face| {
        let drop = flagged.get(idx).copied().unwrap_or(false);
        idx += 1;
        if drop {
            for &v in face {
                touched[v as usize] = true;
            }
        }
        !drop
    });
    let removed = before - mesh.faces.len();
    if removed > 0 {
        drop_orphans(mesh, &touched);
    }
    removed
}

/// Delete flagged vertices together with every face and loose edge using
/// them.
///
/// Returns the number of vertices removed.
pub fn delete_vertices(mesh: &mut Mesh, flagged: &[bool]) -> usize {
    let mut touched = vec![false; mesh.vertices.len()];
    mesh.faces.retain(|face| {
        let drop = face.iter().any(|&v| flagged[v as usize]);
        if drop {
            for &v in face {
                touched[v as usize] = true;
            }
        }
        !drop
    });
    mesh.loose_edges
        .retain(|e| !flagged[e[0] as usize] && !flagged[e[1] as usize]);

    // Vertices of deleted faces that end up unused go too, the way deleting
    // faces removes their now-loose edges
    let used = used_vertices(mesh);
    let keep: Vec<bool> = (0..mesh.vertices.len())
        .map(|v| !flagged[v] && (used[v] || !touched[v]))
        .collect();
    mesh.retain_vertices(&keep)
}

/// Merge vertices within `threshold` of each other.
///
/// Polygons lose repeated corners; polygons left with fewer than three
/// corners and duplicate polygons are removed. Returns the number of
/// vertices removed.
pub fn remove_doubles(mesh: &mut Mesh, threshold: f64) -> usize {
    let count = mesh.vertices.len();
    if count == 0 {
        return 0;
    }

    let cell_size = (threshold * 2.0).max(1e-12);
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        grid.entry(cell_of(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..count as u32).collect();
    let mut merged = 0;
    for idx in 0..count {
        if remap[idx] != idx as u32 {
            continue;
        }
        let position = mesh.vertices[idx].position;
        let cell = cell_of(&position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other in candidates {
                        let other = other as usize;
                        if other <= idx || remap[other] != other as u32 {
                            continue;
                        }
                        if (mesh.vertices[other].position - position).norm() <= threshold {
                            remap[other] = idx as u32;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }
    let removed = apply_merge(mesh, &remap);
    info!(threshold, removed, "Merged doubles");
    removed
}

/// Collapse edges no longer than `threshold` and faces whose smallest height
/// is no larger than `threshold`, until nothing degenerate is left.
///
/// Returns the number of vertices removed.
pub fn dissolve_degenerate(mesh: &mut Mesh, threshold: f64) -> usize {
    let mut removed = 0;
    loop {
        let table = EdgeTable::build(mesh);
        let mut clusters = UnionFind::new(mesh.vertices.len());
        let mut any = false;

        for idx in 0..table.edge_count() {
            if table.edge_length(idx, mesh) <= threshold {
                let [a, b] = table.edge(idx).verts;
                any |= clusters.union(a as usize, b as usize);
            }
        }

        if !any {
            for face_idx in 0..mesh.face_count() {
                if face_min_height(mesh, face_idx) > threshold {
                    continue;
                }
                let face = &mesh.faces[face_idx];
                let n = face.len();
                let shortest = (0..n).min_by(|&i, &j| {
                    let li = (mesh.position(face[i]) - mesh.position(face[(i + 1) % n])).norm();
                    let lj = (mesh.position(face[j]) - mesh.position(face[(j + 1) % n])).norm();
                    li.total_cmp(&lj)
                });
                if let Some(i) = shortest {
                    any |= clusters.union(face[i] as usize, face[(i + 1) % n] as usize);
                }
            }
        }

        if !any {
            break;
        }

        // Move each cluster to its mean position, keeping the smallest index
        let remap: Vec<u32> = (0..mesh.vertices.len())
            .map(|v| clusters.find(v) as u32)
            .collect();
        let mut sums: HashMap<u32, (nalgebra::Vector3<f64>, usize)> = HashMap::new();
        for (v, &root) in remap.iter().enumerate() {
            let entry = sums.entry(root).or_insert((nalgebra::Vector3::zeros(), 0));
            entry.0 += mesh.vertices[v].position.coords;
            entry.1 += 1;
        }
        for (root, (sum, n)) in sums {
            if n > 1 {
                mesh.vertices[root as usize].position = Point3::from(sum / n as f64);
            }
        }

        let step = apply_merge(mesh, &remap);
        debug!(removed = step, "Dissolved degenerate elements");
        if step == 0 {
            break;
        }
        removed += step;
    }

    if removed > 0 {
        info!(threshold, removed, "Dissolved degenerate geometry");
    }
    removed
}

/// Replace the listed polygons with triangles.
///
/// The first triangle of each polygon keeps its index; the rest are appended.
/// Returns the number of polygons that were split.
pub fn triangulate_faces(mesh: &mut Mesh, faces: &[usize]) -> usize {
    let mut appended = Vec::new();
    let mut count = 0;
    for &face_idx in faces {
        let Some(face) = mesh.faces.get(face_idx) else {
            continue;
        };
        if face.len() <= 3 {
            continue;
        }
        let face = face.clone();
        let tris = triangulate_polygon(&mesh.face_positions(face_idx));
        let mut tris = tris.into_iter().map(|[a, b, c]| vec![face[a], face[b], face[c]]);
        if let Some(first) = tris.next() {
            mesh.faces[face_idx] = first;
            appended.extend(tris);
            count += 1;
        }
    }
    mesh.faces.extend(appended);
    if count > 0 {
        debug!(polygons = count, "Triangulated polygons");
    }
    count
}

/// Remap vertices, clean up collapsed polygons and drop the merged vertices.
///
/// `remap[v]` must point at a vertex that maps to itself.
fn apply_merge(mesh: &mut Mesh, remap: &[u32]) -> usize {
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = remap[*v as usize];
        }
        face.dedup();
        while face.len() > 1 && face.first() == face.last() {
            face.pop();
        }
    }
    mesh.faces.retain(|f| f.len() >= 3);

    let mut seen: HashSet<Vec<u32>> = HashSet::new();
    mesh.faces.retain(|f| seen.insert(face_key(f)));

    let mut seen_edges: HashSet<[u32; 2]> = HashSet::new();
    mesh.loose_edges.retain_mut(|e| {
        e[0] = remap[e[0] as usize];
        e[1] = remap[e[1] as usize];
        let key = [e[0].min(e[1]), e[0].max(e[1])];
        e[0] != e[1] && seen_edges.insert(key)
    });

    let keep: Vec<bool> = remap
        .iter()
        .enumerate()
        .map(|(v, &r)| r == v as u32)
        .collect();
    mesh.retain_vertices(&keep)
}

/// Rotation- and direction-independent key of a polygon.
fn face_key(face: &[u32]) -> Vec<u32> {
    let mut key = face.to_vec();
    key.sort_unstable();
    key
}

fn used_vertices(mesh: &Mesh) -> Vec<bool> {
    let mut used = vec![false; mesh.vertices.len()];
    for &v in mesh.faces.iter().flatten() {
        used[v as usize] = true;
    }
    for e in &mesh.loose_edges {
        used[e[0] as usize] = true;
        used[e[1] as usize] = true;
    }
    used
}

/// Remove `touched` vertices that nothing references any more.
fn drop_orphans(mesh: &mut Mesh, touched: &[bool]) {
    let used = used_vertices(mesh);
    let keep: Vec<bool> = used
        .iter()
        .zip(touched)
        .map(|(&u, &t)| u || !t)
        .collect();
    mesh.retain_vertices(&keep);
}

fn cell_of(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Union-find keeping the smallest index as the root.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `true` when `a` and `b` were in different sets.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (lo, hi) = (ra.min(rb), ra.max(rb));
        self.parent[hi] = lo;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vertex;
    use crate::types::tests::make_unit_cube;

    #[test]
    fn test_delete_loose() {
        let mut mesh = make_unit_cube();
        // floating triangle, wire edge and stray vertex
        let base = mesh.vertices.len() as u32;
        for p in [[5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [5.0, 1.0, 0.0], [9.0, 9.0, 9.0], [9.0, 9.0, 8.0], [7.0, 7.0, 7.0]] {
            mesh.vertices.push(Vertex::from_coords(p[0], p[1], p[2]));
        }
        mesh.faces.push(vec![base, base + 1, base + 2]);
        mesh.loose_edges.push([base + 3, base + 4]);

        let removed = delete_loose(&mut mesh);
        assert_eq!(removed, 1 + 1 + 6);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 6);
        assert!(mesh.loose_edges.is_empty());
    }

    #[test]
    fn test_delete_loose_keeps_closed_mesh() {
        let mut cube = make_unit_cube();
        assert_eq!(delete_loose(&mut cube), 0);
        assert_eq!(cube, make_unit_cube());
    }

    #[test]
    fn test_delete_interior() {
        // cube split in half by an internal wall sharing the middle ring
        let mut mesh = Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0],
                [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [2.0, 0.0, 1.0], [2.0, 1.0, 1.0],
            ],
            vec![
                vec![0, 3, 2, 1],
                vec![4, 5, 6, 7],
                vec![0, 1, 5, 4],
                vec![2, 3, 7, 6],
                vec![0, 4, 7, 3],
                vec![1, 2, 6, 5], // wall
                vec![1, 8, 9, 2],
                vec![5, 6, 11, 10],
                vec![1, 5, 10, 8],
                vec![2, 9, 11, 6],
                vec![8, 10, 11, 9],
            ],
        );
        assert_eq!(delete_interior(&mut mesh), 1);
        assert_eq!(mesh.face_count(), 10);
        // wall vertices are still used by the outer faces
        assert_eq!(mesh.vertex_count(), 12);
    }

    #[test]
    fn test_remove_doubles_welds_split_cube() {
        let cube = make_unit_cube();
        // every face gets its own copy of its corners
        let mut split = Mesh::new();
        for f in 0..cube.face_count() {
            let base = split.vertices.len() as u32;
            for p in cube.face_positions(f) {
                split.vertices.push(Vertex::new(p));
            }
            split.faces.push((base..base + 4).collect());
        }
        assert_eq!(split.vertex_count(), 24);

        let removed = remove_doubles(&mut split, 1e-4);
        assert_eq!(removed, 16);
        assert_eq!(split.vertex_count(), 8);
        assert_eq!(split.face_count(), 6);
        assert!((split.volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_doubles_drops_collapsed_faces() {
        let mut mesh = Mesh::from_parts(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.00001, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 1, 3]],
        );
        remove_doubles(&mut mesh, 1e-4);
        assert_eq!(mesh.vertex_count(), 3);
        // the sliver disappears and the two remaining faces are duplicates
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_dissolve_short_edge() {
        let mut cube = make_unit_cube();
        cube.vertices.push(Vertex::from_coords(1.0, 0.0, 0.00005));
        // split the right face's bottom corner with a tiny edge
        cube.faces[5] = vec![1, 2, 6, 5, 8];
        cube.faces[2] = vec![0, 1, 8, 5, 4];
        let removed = dissolve_degenerate(&mut cube, 1e-4);
        assert_eq!(removed, 1);
        assert_eq!(cube.vertex_count(), 8);
        assert!(cube.faces.iter().all(|f| f.len() == 4));
    }

    #[test]
    fn test_dissolve_sliver_face() {
        let mut mesh = Mesh::from_parts(
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 0.00001, 0.0], [1.0, 1.0, 0.0]],
            vec![vec![0, 1, 2], vec![0, 2, 1, 3]],
        );
        dissolve_degenerate(&mut mesh, 1e-4);
        assert!(mesh.faces.iter().all(|f| f.len() >= 3));
        assert!((0..mesh.face_count()).all(|f| face_min_height(&mesh, f) > 1e-4));
    }

    #[test]
    fn test_triangulate_faces() {
        let mut cube = make_unit_cube();
        let n = triangulate_faces(&mut cube, &[0, 3]);
        assert_eq!(n, 2);
        assert_eq!(cube.face_count(), 8);
        assert_eq!(cube.faces[0].len(), 3);
        assert!((cube.volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_delete_vertices() {
        let mut cube = make_unit_cube();
        let mut flagged = vec![false; 8];
        flagged[0] = true;
        let removed = delete_vertices(&mut cube, &flagged);
        assert_eq!(removed, 1);
        assert_eq!(cube.face_count(), 3);
    }
}
