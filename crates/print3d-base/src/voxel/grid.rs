//! Voxel grid holding a sampled signed distance field.

use nalgebra::Point3;
use tracing::{debug, info};

use print3d_toolbox::{BoundingBox, Mesh};

use crate::error::{BaseError, BaseResult};

/// Regular grid of SDF samples taken at voxel centers.
///
/// Values are stored x-fastest: `x + y * nx + z * nx * ny`.
#[derive(Debug)]
pub struct SdfGrid {
    pub dims: [usize; 3],
    /// Min corner of the first voxel.
    pub origin: Point3<f64>,
    pub voxel_size: f64,
    /// Signed distances, negative inside.
    pub values: Vec<f32>,
}

impl SdfGrid {
    /// Grid covering `bounds` grown by `padding` voxels on every side.
    pub fn around(
        bounds: &BoundingBox,
        voxel_size: f64,
        padding: usize,
        max_voxels: usize,
    ) -> BaseResult<Self> {
        if voxel_size.is_nan() || voxel_size <= 0.0 {
            return Err(BaseError::invalid_param(
                "voxel_size",
                format!("{} is not positive", voxel_size),
            ));
        }
        let pad = padding as f64 * voxel_size;
        let origin = bounds.min - nalgebra::Vector3::repeat(pad);
        let extent = bounds.extents().add_scalar(2.0 * pad);
        let dims = [
            ((extent.x / voxel_size).ceil() as usize).max(1),
            ((extent.y / voxel_size).ceil() as usize).max(1),
            ((extent.z / voxel_size).ceil() as usize).max(1),
        ];

        let total = dims[0] * dims[1] * dims[2];
        if total > max_voxels {
            return Err(BaseError::grid_too_large(dims, max_voxels, voxel_size));
        }

        info!(dims = ?dims, total, voxel_size, "creating SDF grid");
        Ok(Self {
            dims,
            origin,
            voxel_size,
            values: vec![f32::MAX; total],
        })
    }

    #[inline]
    pub fn total_voxels(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn linearize(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// World position of a voxel center.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Point3<f64> {
        Point3::new(
            self.origin.x + (x as f64 + 0.5) * self.voxel_size,
            self.origin.y + (y as f64 + 0.5) * self.voxel_size,
            self.origin.z + (z as f64 + 0.5) * self.voxel_size,
        )
    }

    /// World position of a point given in (fractional) voxel coordinates.
    #[inline]
    pub fn to_world(&self, p: [f32; 3]) -> Point3<f64> {
        Point3::new(
            self.origin.x + (p[0] as f64 + 0.5) * self.voxel_size,
            self.origin.y + (p[1] as f64 + 0.5) * self.voxel_size,
            self.origin.z + (p[2] as f64 + 0.5) * self.voxel_size,
        )
    }

    /// Sample the signed distance to a closed mesh at every voxel center.
    pub fn compute_sdf(&mut self, mesh: &Mesh) {
        use mesh_to_sdf::{Grid, SignMethod, Topology, generate_grid_sdf};

        let tris = mesh.triangulated().mesh;
        let vertices: Vec<[f32; 3]> = tris
            .vertices
            .iter()
            .map(|v| {
                [
                    v.position.x as f32,
                    v.position.y as f32,
                    v.position.z as f32,
                ]
            })
            .collect();
        let indices: Vec<u32> = tris.faces.iter().flatten().copied().collect();

        let max = [
            self.origin.x + self.dims[0] as f64 * self.voxel_size,
            self.origin.y + self.dims[1] as f64 * self.voxel_size,
            self.origin.z + self.dims[2] as f64 * self.voxel_size,
        ];
        let grid = Grid::from_bounding_box(
            &[
                self.origin.x as f32,
                self.origin.y as f32,
                self.origin.z as f32,
            ],
            &[max[0] as f32, max[1] as f32, max[2] as f32],
            self.dims,
        );

        let sampled = generate_grid_sdf(
            &vertices,
            Topology::TriangleList(Some(&indices)),
            &grid,
            SignMethod::Raycast,
        );

        // mesh_to_sdf has its own cell order
        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    let dst = self.linearize(x, y, z);
                    self.values[dst] = sampled[grid.get_cell_idx(&[x, y, z])];
                }
            }
        }

        debug!(
            min_sdf = self.values.iter().copied().fold(f32::INFINITY, f32::min),
            max_sdf = self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            "SDF computed"
        );
    }
}
