//! Isosurface extraction with Surface Nets.

use fast_surface_nets::{SurfaceNetsBuffer, ndshape::RuntimeShape, surface_nets};
use tracing::{debug, info};

use print3d_toolbox::{Mesh, Vertex};

use super::grid::SdfGrid;

/// Sample value for the padding layer around the grid.
const OUTSIDE: f32 = 1.0e6;

/// Extract the zero isosurface of `grid` as a triangle mesh.
///
/// The grid is wrapped in one layer of "far outside" samples so the
/// surface closes at the grid border. Winding is whatever Surface Nets
/// produces; callers fix orientation.
pub fn extract_isosurface(grid: &SdfGrid) -> Mesh {
    let padded = [grid.dims[0] + 2, grid.dims[1] + 2, grid.dims[2] + 2];
    let mut samples = vec![OUTSIDE; padded[0] * padded[1] * padded[2]];

    for z in 0..grid.dims[2] {
        for y in 0..grid.dims[1] {
            for x in 0..grid.dims[0] {
                let dst = (x + 1) + (y + 1) * padded[0] + (z + 1) * padded[0] * padded[1];
                samples[dst] = grid.values[grid.linearize(x, y, z)];
            }
        }
    }

    let shape = RuntimeShape::<u32, 3>::new([padded[0] as u32, padded[1] as u32, padded[2] as u32]);
    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(
        &samples,
        &shape,
        [0, 0, 0],
        [
            padded[0] as u32 - 1,
            padded[1] as u32 - 1,
            padded[2] as u32 - 1,
        ],
        &mut buffer,
    );
    debug!(
        positions = buffer.positions.len(),
        indices = buffer.indices.len(),
        "surface nets complete"
    );

    let mut mesh = Mesh::with_capacity(buffer.positions.len(), buffer.indices.len() / 3);
    for p in &buffer.positions {
        mesh.vertices
            .push(Vertex::new(grid.to_world([p[0] - 1.0, p[1] - 1.0, p[2] - 1.0])));
    }
    for tri in buffer.indices.chunks_exact(3) {
        mesh.faces.push(tri.to_vec());
    }

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "isosurface extracted"
    );
    mesh
}
