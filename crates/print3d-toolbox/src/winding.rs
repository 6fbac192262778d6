//! Normal consistency and outward orientation.

use nalgebra::Vector3;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::adjacency::{EdgeTable, edge_direction_in_face};
use crate::types::{Mesh, flip_polygon};

/// Make face windings agree across manifold edges and point each connected
/// component outwards.
///
/// Uses BFS flood fill from the first face of every component. A neighbour
/// that traverses a shared edge in the same direction as the current face is
/// flipped. The face whose center lies farthest from the component centroid
/// then decides whether the whole component is reversed.
///
/// Returns the number of faces whose winding changed.
pub fn normals_make_consistent(mesh: &mut Mesh) -> usize {
    if mesh.faces.is_empty() {
        return 0;
    }

    let table = EdgeTable::build(mesh);
    let face_count = mesh.faces.len();
    let mut visited = vec![false; face_count];
    let mut flip = vec![false; face_count];
    let mut components = 0;

    for start in 0..face_count {
        if visited[start] {
            continue;
        }
        components += 1;
        visited[start] = true;

        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(face_idx) = queue.pop_front() {
            let face = &mesh.faces[face_idx];
            let n = face.len();
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                let Some(edge) = table.find(a, b) else {
                    continue;
                };
                if !table.is_manifold(edge) {
                    continue;
                }
                for &other in table.faces_for_edge(edge) {
                    if other == face_idx || visited[other] {
                        continue;
                    }
                    visited[other] = true;
                    // Current face traverses a -> b; a consistent neighbour
                    // traverses b -> a
                    let same = edge_direction_in_face(&mesh.faces[other], a, b).unwrap_or(false);
                    flip[other] = same != flip[face_idx];
                    component.push(other);
                    queue.push_back(other);
                }
            }
        }

        if points_inward(mesh, &component, &flip) {
            for &f in &component {
                flip[f] = !flip[f];
            }
        }
    }

    let mut flipped = 0;
    for (face, &f) in mesh.faces.iter_mut().zip(&flip) {
        if f {
            flip_polygon(face);
            flipped += 1;
        }
    }

    if flipped > 0 {
        info!(flipped, components, "Recalculated normals");
    } else {
        debug!(components, "Normals already consistent");
    }
    flipped
}

/// Whether the outermost face of a component, with pending flips applied,
/// faces the component centroid.
fn points_inward(mesh: &Mesh, component: &[usize], flip: &[bool]) -> bool {
    let centers: Vec<_> = component.iter().map(|&f| mesh.face_center(f)).collect();
    let centroid = centers
        .iter()
        .fold(Vector3::zeros(), |acc, c| acc + c.coords)
        / component.len() as f64;

    let farthest = centers
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (a.coords - centroid)
                .norm_squared()
                .total_cmp(&(b.coords - centroid).norm_squared())
        })
        .map(|(i, _)| i);
    let Some(i) = farthest else {
        return false;
    };

    let face_idx = component[i];
    let mut normal = mesh.face_normal_unnormalized(face_idx);
    if flip[face_idx] {
        normal = -normal;
    }
    normal.dot(&(centers[i].coords - centroid)) < 0.0
}
