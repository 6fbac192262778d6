//! Give an open sheet a uniform thickness.

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use print3d_toolbox::{Mesh, flip_polygon};

use super::rim::generate_rim;

/// Statistics from [`solidify`].
#[derive(Debug, Clone)]
pub struct SolidifyStats {
    pub surface_vertices: usize,
    pub rim_faces: usize,
    pub boundary_loops: usize,
    /// Vertices without a usable normal, offset along +Z instead.
    pub fallback_normals: usize,
}

/// Thicken `sheet` by `thickness`, centered on the original surface.
///
/// The back surface sits at `-thickness / 2` along the vertex normals with
/// reversed faces, the front surface at `+thickness / 2`, and every boundary
/// loop is closed with a rim, so the result is watertight when the sheet is
/// a manifold surface.
pub fn solidify(sheet: &Mesh, thickness: f64) -> (Mesh, SolidifyStats) {
    let n = sheet.vertex_count();
    let half = thickness / 2.0;

    let mut with_normals = sheet.clone();
    with_normals.compute_vertex_normals();

    let mut fallback_normals = 0;
    let normals: Vec<Vector3<f64>> = with_normals
        .vertices
        .iter()
        .map(|v| {
            v.normal.unwrap_or_else(|| {
                fallback_normals += 1;
                Vector3::z()
            })
        })
        .collect();
    if fallback_normals > 0 {
        warn!(count = fallback_normals, "vertices without normals, using +Z");
    }

    let mut shell = Mesh::with_capacity(2 * n, 2 * sheet.face_count());

    for (vertex, normal) in with_normals.vertices.iter().zip(&normals) {
        let mut back = vertex.clone();
        back.position -= normal * half;
        back.normal = Some(-normal);
        shell.vertices.push(back);
    }
    for (vertex, normal) in with_normals.vertices.iter().zip(&normals) {
        let mut front = vertex.clone();
        front.position += normal * half;
        shell.vertices.push(front);
    }
    debug!("generated {} back + {} front vertices", n, n);

    for face in &sheet.faces {
        let mut back = face.clone();
        flip_polygon(&mut back);
        shell.faces.push(back);
    }
    let offset = n as u32;
    for face in &sheet.faces {
        shell.faces.push(face.iter().map(|&v| v + offset).collect());
    }

    let rim = generate_rim(sheet, offset);
    let rim_faces = rim.faces.len();
    shell.faces.extend(rim.faces);

    info!(
        vertices = shell.vertex_count(),
        faces = shell.face_count(),
        thickness,
        "solidify complete"
    );

    let stats = SolidifyStats {
        surface_vertices: n,
        rim_faces,
        boundary_loops: rim.loops,
        fallback_normals,
    };
    (shell, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use print3d_toolbox::EdgeTable;

    fn grid(n: u32) -> Mesh {
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push([i as f64, j as f64, 0.0]);
            }
        }
        let row = n + 1;
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                faces.push(vec![a, a + 1, a + row + 1, a + row]);
            }
        }
        Mesh::from_parts(&positions, faces)
    }

    #[test]
    fn test_flat_sheet_becomes_a_slab() {
        let (slab, stats) = solidify(&grid(2), 0.5);
        assert_eq!(stats.surface_vertices, 9);
        assert_eq!(stats.rim_faces, 8);
        assert_eq!(stats.boundary_loops, 1);
        assert_eq!(slab.vertex_count(), 18);
        assert_eq!(slab.face_count(), 4 + 4 + 8);

        let bounds = slab.bounding_box().unwrap();
        assert_relative_eq!(bounds.min.z, -0.25, epsilon = 1e-12);
        assert_relative_eq!(bounds.max.z, 0.25, epsilon = 1e-12);
        assert_relative_eq!(slab.signed_volume(), 4.0 * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_slab_is_closed_and_consistent() {
        let (slab, _) = solidify(&grid(3), 0.2);
        let table = EdgeTable::build(&slab);
        for e in 0..table.edge_count() {
            assert!(table.is_manifold(e), "edge {} is not manifold", e);
            assert!(table.is_contiguous(e, &slab), "edge {} flips", e);
        }
    }
}
