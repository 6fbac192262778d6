//! Per-element measurements used by the checks.

use nalgebra::Vector3;

use crate::adjacency::EdgeTable;
use crate::types::Mesh;

/// Angle between two vectors, or `fallback` when either has zero length.
pub fn angle_or(a: &Vector3<f64>, b: &Vector3<f64>, fallback: f64) -> f64 {
    let la = a.norm();
    let lb = b.norm();
    if la <= f64::EPSILON || lb <= f64::EPSILON {
        return fallback;
    }
    (a.dot(b) / (la * lb)).clamp(-1.0, 1.0).acos()
}

/// Normal of the corner at position `corner` of a face.
///
/// Built from the two adjacent sides; a corner whose sides are collinear
/// takes the face normal.
pub fn corner_normal(mesh: &Mesh, face_idx: usize, corner: usize) -> Vector3<f64> {
    let face = &mesh.faces[face_idx];
    let n = face.len();
    let v = mesh.position(face[corner]);
    let prev = mesh.position(face[(corner + n - 1) % n]);
    let next = mesh.position(face[(corner + 1) % n]);

    let cross = (v - prev).cross(&(next - v));
    cross
        .try_normalize(f64::EPSILON)
        .or_else(|| mesh.face_normal(face_idx))
        .unwrap_or_else(Vector3::zeros)
}

/// Whether any corner normal deviates from the face normal by more than
/// `angle_limit` radians. Zero-area faces always count as distorted.
pub fn face_is_distorted(mesh: &Mesh, face_idx: usize, angle_limit: f64) -> bool {
    let normal = mesh.face_normal(face_idx).unwrap_or_else(Vector3::zeros);
    (0..mesh.faces[face_idx].len()).any(|corner| {
        let mut corner_no = corner_normal(mesh, face_idx, corner);
        if corner_no.dot(&normal) < 0.0 {
            corner_no = -corner_no;
        }
        angle_or(&normal, &corner_no, 1000.0) > angle_limit
    })
}

/// Signed angle between the two faces of a manifold edge.
///
/// Positive for convex edges, negative for concave ones; `None` when the
/// edge is not manifold or a face has no normal.
pub fn face_angle_signed(mesh: &Mesh, table: &EdgeTable, edge_idx: usize) -> Option<f64> {
    let faces = table.faces_for_edge(edge_idx);
    if faces.len() != 2 {
        return None;
    }
    let n0 = mesh.face_normal(faces[0])?;
    let n1 = mesh.face_normal(faces[1])?;
    let angle = angle_or(&n0, &n1, 0.0);

    let to_other = mesh.face_center(faces[1]) - mesh.face_center(faces[0]);
    if to_other.dot(&n0) > 0.0 {
        Some(-angle)
    } else {
        Some(angle)
    }
}

/// Shortest height of a face: twice its area over its longest side.
pub fn face_min_height(mesh: &Mesh, face_idx: usize) -> f64 {
    let face = &mesh.faces[face_idx];
    let n = face.len();
    let longest = (0..n)
        .map(|i| (mesh.position(face[i]) - mesh.position(face[(i + 1) % n])).norm())
        .fold(0.0, f64::max);
    if longest <= 0.0 {
        return 0.0;
    }
    2.0 * mesh.face_area(face_idx) / longest
}
