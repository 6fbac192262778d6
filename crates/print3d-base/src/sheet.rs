//! The draped sheet: a dense plane above the target, projected straight
//! down onto it and trimmed to the part that landed.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use print3d_toolbox::bvh::TriangleBvh;
use print3d_toolbox::{BoundingBox, Mesh, Vertex};

use crate::error::{BaseError, BaseResult};

/// Z value given to sheet vertices that did not land on the target.
pub const PUSH_AWAY_Z: f64 = -1.0;

/// Relative slack on the trim height. Projected points carry rounding from
/// `origin + t * direction` and may land a few ULPs above the target top.
pub const TRIM_TOLERANCE: f64 = 1e-9;

/// Horizontal rectangle at height `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneRect {
    pub center: Point3<f64>,
    pub size_x: f64,
    pub size_y: f64,
}

impl PlaneRect {
    /// Footprint of `bounds` scaled by `margin` and lifted `lift` above the top.
    pub fn above(bounds: &BoundingBox, margin: f64, lift: f64) -> Self {
        let extents = bounds.extents();
        let center = bounds.center();
        Self {
            center: Point3::new(center.x, center.y, bounds.max.z + lift),
            size_x: extents.x * margin,
            size_y: extents.y * margin,
        }
    }

    /// Number of grid cells along x and y for the given cell size.
    pub fn cells(&self, cell_size: f64) -> [usize; 2] {
        [
            ((self.size_x / cell_size).ceil() as usize).max(1),
            ((self.size_y / cell_size).ceil() as usize).max(1),
        ]
    }
}

/// Regular quad grid covering `rect`, faces wound counter-clockwise seen
/// from above. Cells are at most `cell_size` wide.
pub fn densified_plane(rect: &PlaneRect, cell_size: f64, max_cells: usize) -> BaseResult<Mesh> {
    let [nx, ny] = rect.cells(cell_size);
    if nx * ny > max_cells {
        return Err(BaseError::grid_too_large([nx, ny, 1], max_cells, cell_size));
    }

    let mut mesh = Mesh::with_capacity((nx + 1) * (ny + 1), nx * ny);
    let x0 = rect.center.x - rect.size_x / 2.0;
    let y0 = rect.center.y - rect.size_y / 2.0;
    let dx = rect.size_x / nx as f64;
    let dy = rect.size_y / ny as f64;

    for j in 0..=ny {
        for i in 0..=nx {
            mesh.vertices.push(Vertex::from_coords(
                x0 + i as f64 * dx,
                y0 + j as f64 * dy,
                rect.center.z,
            ));
        }
    }

    let row = (nx + 1) as u32;
    for j in 0..ny as u32 {
        for i in 0..nx as u32 {
            let a = j * row + i;
            mesh.faces.push(vec![a, a + 1, a + row + 1, a + row]);
        }
    }

    debug!(nx, ny, vertices = mesh.vertex_count(), "densified plane");
    Ok(mesh)
}

/// Project every vertex along −Z onto `target` (world-space, triangulated).
///
/// A vertex whose ray misses stays where it is. Returns the number of hits.
pub fn shrinkwrap_down(sheet: &mut Mesh, target: &Mesh) -> usize {
    let bvh = TriangleBvh::from_mesh(target);
    let down = -Vector3::z();

    let hits: Vec<Option<Point3<f64>>> = sheet
        .vertices
        .par_iter()
        .map(|v| {
            bvh.ray_cast(&v.position, &down, f64::INFINITY, None)
                .map(|hit| hit.point)
        })
        .collect();

    let mut count = 0;
    for (vertex, hit) in sheet.vertices.iter_mut().zip(hits) {
        if let Some(point) = hit {
            vertex.position = point;
            count += 1;
        }
    }

    info!(
        hits = count,
        misses = sheet.vertex_count() - count,
        "shrinkwrap projection"
    );
    count
}

/// Push vertices above `top` down to [`PUSH_AWAY_Z`], then delete every
/// face whose center ends up below zero and any vertex left unused.
///
/// Vertices within [`TRIM_TOLERANCE`] (relative) of `top` count as landed.
/// Returns the number of faces removed.
pub fn trim_above(sheet: &mut Mesh, top: f64) -> usize {
    let limit = top + TRIM_TOLERANCE * top.abs().max(1.0);
    let mut pushed = 0;
    for vertex in &mut sheet.vertices {
        if vertex.position.z > limit {
            vertex.position.z = PUSH_AWAY_Z;
            pushed += 1;
        }
    }

    let before = sheet.face_count();
    let keep: Vec<bool> = (0..before).map(|f| sheet.face_center(f).z >= 0.0).collect();
    let mut flags = keep.into_iter();
    sheet.faces.retain(|_| flags.next().unwrap_or(true));
    let removed = before - sheet.face_count();
    sheet.remove_unused_vertices();

    debug!(pushed, removed, remaining = sheet.face_count(), "trimmed sheet");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(size: f64) -> PlaneRect {
        PlaneRect {
            center: Point3::new(0.0, 0.0, 10.0),
            size_x: size,
            size_y: size,
        }
    }

    /// Axis-aligned box of triangles, `[0, 2] x [0, 2] x [0, h]`.
    fn block(h: f64) -> Mesh {
        Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
                [0.0, 0.0, h],
                [2.0, 0.0, h],
                [2.0, 2.0, h],
                [0.0, 2.0, h],
            ],
            vec![
                vec![0, 2, 1],
                vec![0, 3, 2],
                vec![4, 5, 6],
                vec![4, 6, 7],
                vec![0, 1, 5],
                vec![0, 5, 4],
                vec![2, 3, 7],
                vec![2, 7, 6],
                vec![0, 4, 7],
                vec![0, 7, 3],
                vec![1, 2, 6],
                vec![1, 6, 5],
            ],
        )
    }

    #[test]
    fn test_plane_above_bounds() {
        let bounds = BoundingBox {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(2.0, 4.0, 1.0),
        };
        let plane = PlaneRect::above(&bounds, 1.1, 5.0);
        assert_eq!(plane.center, Point3::new(1.0, 2.0, 6.0));
        assert!((plane.size_x - 2.2).abs() < 1e-12);
        assert!((plane.size_y - 4.4).abs() < 1e-12);
    }

    #[test]
    fn test_densified_plane_cell_size() {
        let mesh = densified_plane(&rect(4.0), 0.5, 10_000).unwrap();
        assert_eq!(mesh.face_count(), 64);
        assert_eq!(mesh.vertex_count(), 81);
        let area: f64 = (0..mesh.face_count()).map(|f| mesh.face_area(f)).sum();
        assert!((area - 16.0).abs() < 1e-9);
        assert!(mesh.face_normal(0).unwrap().z > 0.99);
    }

    #[test]
    fn test_densified_plane_respects_budget() {
        let err = densified_plane(&rect(100.0), 0.1, 1000).unwrap_err();
        assert!(matches!(err, BaseError::GridTooLarge { .. }));
    }

    #[test]
    fn test_shrinkwrap_hits_and_misses() {
        let target = block(1.0);
        let mut sheet = Mesh::from_parts(
            &[[1.2, 0.7, 6.0], [5.0, 5.0, 6.0], [0.5, 1.5, 6.0]],
            vec![vec![0, 1, 2]],
        );
        let hits = shrinkwrap_down(&mut sheet, &target);
        assert_eq!(hits, 2);
        assert!((sheet.vertices[0].position.z - 1.0).abs() < 1e-9);
        assert_eq!(sheet.vertices[1].position.z, 6.0);
        assert!((sheet.vertices[2].position.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trim_pushes_and_deletes() {
        // two quads on the target top, one hanging off the edge
        let mut sheet = Mesh::from_parts(
            &[
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [2.0, 0.0, 1.0],
                [3.0, 0.0, 6.0],
                [0.0, 1.0, 1.0],
                [1.0, 1.0, 1.0],
                [2.0, 1.0, 1.0],
                [3.0, 1.0, 6.0],
            ],
            vec![vec![0, 1, 5, 4], vec![1, 2, 6, 5], vec![2, 3, 7, 6]],
        );
        let removed = trim_above(&mut sheet, 1.0);
        // center z of the last quad: (1 + 1 - 1 - 1) / 4 = 0, kept
        assert_eq!(removed, 0);
        assert_eq!(sheet.vertices[3].position.z, PUSH_AWAY_Z);

        let mut lone = Mesh::from_parts(
            &[[0.0, 0.0, 6.0], [1.0, 0.0, 6.0], [0.0, 1.0, 1.0]],
            vec![vec![0, 1, 2]],
        );
        assert_eq!(trim_above(&mut lone, 1.0), 1);
        assert_eq!(lone.vertex_count(), 0);
    }

    #[test]
    fn test_trim_keeps_points_rounded_above_top() {
        let top: f64 = 2.9;
        let above = f64::from_bits(top.to_bits() + 3);
        let mut sheet = Mesh::from_parts(
            &[[0.0, 0.0, above], [1.0, 0.0, above], [0.0, 1.0, above]],
            vec![vec![0, 1, 2]],
        );
        assert_eq!(trim_above(&mut sheet, top), 0);
        assert_eq!(sheet.vertices[0].position.z, above);
    }

    #[test]
    fn test_landed_sheet_survives_trim_at_any_height() {
        for step in 1..=200 {
            let h = step as f64 * 0.05;
            let target = block(h);
            let bounds = target.bounding_box().unwrap();
            let rect = PlaneRect::above(&bounds, 1.1, 5.0);
            let mut sheet = densified_plane(&rect, 0.3, 10_000).unwrap();

            let hits = shrinkwrap_down(&mut sheet, &target);
            let landed = |m: &Mesh, v: u32| (m.position(v).z - h).abs() < 1e-6;
            let on_top = sheet
                .faces
                .iter()
                .filter(|f| f.iter().all(|&v| landed(&sheet, v)))
                .count();
            assert!(on_top > 0, "h = {}", h);

            trim_above(&mut sheet, bounds.max.z);
            let survivors = (0..sheet.vertex_count() as u32)
                .filter(|&v| landed(&sheet, v))
                .count();
            assert_eq!(survivors, hits, "landed vertices trimmed at h = {}", h);
            assert!(sheet.face_count() >= on_top, "top faces trimmed at h = {}", h);
        }
    }
}
