//! Voxel remeshing through a sampled signed distance field.

mod extract;
mod grid;

pub use extract::extract_isosurface;
pub use grid::SdfGrid;

use std::time::Instant;
use tracing::{debug, info};

use print3d_toolbox::{Mesh, flip_polygon};

use crate::error::{BaseError, BaseResult};

/// Voxels of padding around the input bounds.
const GRID_PADDING: usize = 2;

/// Statistics from [`voxel_remesh`].
#[derive(Debug, Clone)]
pub struct RemeshStats {
    pub grid_dims: [usize; 3],
    pub total_voxels: usize,
    pub sdf_time_ms: u64,
    pub extraction_time_ms: u64,
    pub input_faces: usize,
    pub output_vertices: usize,
    pub output_faces: usize,
    /// Faces were flipped to point outward.
    pub flipped: bool,
}

/// Rebuild a closed mesh as the zero isosurface of its distance field.
///
/// The output is a triangle mesh with uniform density set by `voxel_size`
/// and faces wound outward. Features thinner than about one voxel vanish.
pub fn voxel_remesh(
    mesh: &Mesh,
    voxel_size: f64,
    max_voxels: usize,
) -> BaseResult<(Mesh, RemeshStats)> {
    let bounds = mesh.bounding_box().ok_or(BaseError::EmptyIsosurface { voxel_size })?;
    let mut grid = SdfGrid::around(&bounds, voxel_size, GRID_PADDING, max_voxels)?;

    info!(
        faces = mesh.face_count(),
        dims = ?grid.dims,
        voxel_size,
        "starting voxel remesh"
    );

    let sdf_start = Instant::now();
    grid.compute_sdf(mesh);
    let sdf_time_ms = sdf_start.elapsed().as_millis() as u64;

    let extract_start = Instant::now();
    let mut output = extract_isosurface(&grid);
    let extraction_time_ms = extract_start.elapsed().as_millis() as u64;

    if output.face_count() == 0 {
        return Err(BaseError::EmptyIsosurface { voxel_size });
    }

    let flipped = output.signed_volume() < 0.0;
    if flipped {
        debug!("flipping remeshed faces outward");
        for face in &mut output.faces {
            flip_polygon(face);
        }
    }

    let stats = RemeshStats {
        grid_dims: grid.dims,
        total_voxels: grid.total_voxels(),
        sdf_time_ms,
        extraction_time_ms,
        input_faces: mesh.face_count(),
        output_vertices: output.vertex_count(),
        output_faces: output.face_count(),
        flipped,
    };

    info!(
        sdf_time_ms,
        extraction_time_ms,
        vertices = stats.output_vertices,
        faces = stats.output_faces,
        "voxel remesh complete"
    );

    Ok((output, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(size: f64) -> Mesh {
        Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [size, 0.0, 0.0],
                [size, size, 0.0],
                [0.0, size, 0.0],
                [0.0, 0.0, size],
                [size, 0.0, size],
                [size, size, size],
                [0.0, size, size],
            ],
            vec![
                vec![0, 3, 2, 1],
                vec![4, 5, 6, 7],
                vec![0, 1, 5, 4],
                vec![2, 3, 7, 6],
                vec![0, 4, 7, 3],
                vec![1, 2, 6, 5],
            ],
        )
    }

    #[test]
    fn test_remesh_cube_keeps_volume_and_orientation() {
        let (mesh, stats) = voxel_remesh(&cube(2.0), 0.2, 1_000_000).unwrap();
        assert!(mesh.is_triangulated());
        assert!(mesh.signed_volume() > 0.0);
        assert_relative_eq!(mesh.signed_volume(), 8.0, max_relative = 0.15);
        assert_eq!(stats.output_faces, mesh.face_count());

        let bounds = mesh.bounding_box().unwrap();
        assert!((bounds.min.x - 0.0).abs() < 0.2);
        assert!((bounds.max.z - 2.0).abs() < 0.2);
    }

    #[test]
    fn test_remesh_respects_budget() {
        let err = voxel_remesh(&cube(10.0), 0.01, 10_000).unwrap_err();
        assert_eq!(err.code().as_str(), "BASE-2001");
    }

    #[test]
    fn test_remesh_empty_mesh() {
        let err = voxel_remesh(&Mesh::new(), 0.3, 10_000).unwrap_err();
        assert!(matches!(err, BaseError::EmptyIsosurface { .. }));
    }
}
