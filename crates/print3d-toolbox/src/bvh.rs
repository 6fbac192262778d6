//! Bounding volume hierarchy over triangles.
//!
//! Supports nearest-hit ray casting (wall thickness, shrinkwrap projection)
//! and self-overlap queries (intersection check).

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::types::{Mesh, Triangle};

/// Tolerance used by the triangle overlap and ray tests.
pub const BVH_EPSILON: f64 = 1e-10;

/// Axis-aligned bounding box for spatial acceleration.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn from_triangle(tri: &Triangle) -> Self {
        Self {
            min: tri.v0.inf(&tri.v1).inf(&tri.v2),
            max: tri.v0.sup(&tri.v1).sup(&tri.v2),
        }
    }

    /// Expand by epsilon for numerical robustness.
    pub fn expand(&self, epsilon: f64) -> Self {
        let e = Vector3::repeat(epsilon);
        Self {
            min: self.min - e,
            max: self.max + e,
        }
    }

    fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Slab test. Returns `(t_near, t_far)` clamped to `t >= 0`.
    pub fn ray_intersect(&self, origin: &Point3<f64>, dir_inv: &Vector3<f64>) -> Option<(f64, f64)> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let t1 = (self.min[axis] - origin[axis]) * dir_inv[axis];
            let t2 = (self.max[axis] - origin[axis]) * dir_inv[axis];
            // NaN from 0 * inf means the ray lies in the slab plane
            let (lo, hi) = if t1.is_nan() || t2.is_nan() {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            } else {
                (t1.min(t2), t1.max(t2))
            };
            t_min = t_min.max(lo);
            t_max = t_max.min(hi);
        }

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        aabb: Aabb,
        tri_idx: usize,
    },
    Internal {
        aabb: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn build(triangles: &[Triangle], boxes: &[Aabb], indices: &mut [usize]) -> Option<Self> {
        match indices.len() {
            0 => return None,
            1 => {
                return Some(BvhNode::Leaf {
                    aabb: boxes[indices[0]],
                    tri_idx: indices[0],
                });
            }
            _ => {}
        }

        let combined = indices[1..]
            .iter()
            .fold(boxes[indices[0]], |acc, &i| acc.union(&boxes[i]));

        // Split on the longest axis at the median centroid
        let extent = combined.max - combined.min;
        let axis = extent.imax();
        indices.sort_by(|&a, &b| {
            let ca = triangles[a].centroid()[axis];
            let cb = triangles[b].centroid()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = indices.len() / 2;
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = BvhNode::build(triangles, boxes, left_indices);
        let right = BvhNode::build(triangles, boxes, right_indices);

        match (left, right) {
            (Some(l), Some(r)) => Some(BvhNode::Internal {
                aabb: combined,
                left: Box::new(l),
                right: Box::new(r),
            }),
            (Some(n), None) | (None, Some(n)) => Some(n),
            (None, None) => None,
        }
    }

    fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Closest intersection found by [`TriangleBvh::ray_cast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (unit) ray direction.
    pub distance: f64,
    /// Index of the triangle that was hit.
    pub triangle: usize,
    pub point: Point3<f64>,
}

/// BVH over a triangle soup, optionally remembering the vertex indices of
/// each triangle so self-overlap can skip neighbours.
#[derive(Debug)]
pub struct TriangleBvh {
    triangles: Vec<Triangle>,
    indices: Vec<[u32; 3]>,
    boxes: Vec<Aabb>,
    root: Option<BvhNode>,
}

impl TriangleBvh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self::build(triangles, Vec::new())
    }

    /// Build from a triangulated mesh. Polygons contribute their first three
    /// corners, so triangulate first.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let triangles = mesh.triangles().collect();
        let indices = mesh.faces.iter().map(|f| [f[0], f[1], f[2]]).collect();
        Self::build(triangles, indices)
    }

    fn build(triangles: Vec<Triangle>, indices: Vec<[u32; 3]>) -> Self {
        let boxes: Vec<Aabb> = triangles
            .iter()
            .map(|t| Aabb::from_triangle(t).expand(BVH_EPSILON))
            .collect();
        let mut order: Vec<usize> = (0..triangles.len()).collect();
        let root = BvhNode::build(&triangles, &boxes, &mut order);
        Self {
            triangles,
            indices,
            boxes,
            root,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle(&self, idx: usize) -> &Triangle {
        &self.triangles[idx]
    }

    /// Nearest hit along `direction` within `max_dist`, ignoring the
    /// triangle `skip`.
    pub fn ray_cast(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_dist: f64,
        skip: Option<usize>,
    ) -> Option<RayHit> {
        let root = self.root.as_ref()?;
        let direction = direction.try_normalize(f64::EPSILON)?;
        let dir_inv = direction.map(|d| 1.0 / d);
        let (t, tri) = self.trace(root, origin, &direction, &dir_inv, max_dist, skip)?;
        Some(RayHit {
            distance: t,
            triangle: tri,
            point: origin + direction * t,
        })
    }

    fn trace(
        &self,
        node: &BvhNode,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        dir_inv: &Vector3<f64>,
        max_dist: f64,
        skip: Option<usize>,
    ) -> Option<(f64, usize)> {
        match node.aabb().ray_intersect(origin, dir_inv) {
            Some((t_near, _)) if t_near <= max_dist => {}
            _ => return None,
        }

        match node {
            BvhNode::Leaf { tri_idx, .. } => {
                if skip == Some(*tri_idx) {
                    return None;
                }
                ray_triangle_intersect(origin, direction, &self.triangles[*tri_idx])
                    .filter(|&t| t <= max_dist)
                    .map(|t| (t, *tri_idx))
            }
            BvhNode::Internal { left, right, .. } => {
                let hit_left = self.trace(left, origin, direction, dir_inv, max_dist, skip);
                let limit = hit_left.map_or(max_dist, |(t, _)| t);
                let hit_right = self.trace(right, origin, direction, dir_inv, limit, skip);
                match (hit_left, hit_right) {
                    (Some(l), Some(r)) => Some(if l.0 <= r.0 { l } else { r }),
                    (Some(h), None) | (None, Some(h)) => Some(h),
                    (None, None) => None,
                }
            }
        }
    }

    fn query_aabb(&self, node: &BvhNode, query: &Aabb, out: &mut Vec<usize>) {
        if !node.aabb().overlaps(query) {
            return;
        }
        match node {
            BvhNode::Leaf { tri_idx, .. } => out.push(*tri_idx),
            BvhNode::Internal { left, right, .. } => {
                self.query_aabb(left, query, out);
                self.query_aabb(right, query, out);
            }
        }
    }

    /// All pairs `(i, j)`, `i < j`, of intersecting triangles. Sorted.
    ///
    /// Triangles sharing an edge never count. Triangles sharing a single
    /// vertex count only when they cross along a segment longer than
    /// `sqrt(SHARED_VERTEX_EPSILON)`, so fans meeting at a corner are not
    /// reported.
    pub fn self_overlap(&self) -> Vec<(usize, usize)> {
        let Some(root) = self.root.as_ref() else {
            return Vec::new();
        };

        let mut pairs: Vec<(usize, usize)> = (0..self.triangles.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let mut candidates = Vec::new();
                self.query_aabb(root, &self.boxes[i], &mut candidates);
                candidates
                    .into_iter()
                    .filter(move |&j| j > i && self.pair_intersects(i, j))
                    .map(move |j| (i, j))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    fn pair_intersects(&self, i: usize, j: usize) -> bool {
        let (t1, t2) = (&self.triangles[i], &self.triangles[j]);
        match self.shared_vertex_count(i, j) {
            0 => triangles_intersect(t1, t2, BVH_EPSILON),
            1 => intersection_length(t1, t2)
                .is_some_and(|len| len * len > SHARED_VERTEX_EPSILON),
            _ => false,
        }
    }

    fn shared_vertex_count(&self, i: usize, j: usize) -> usize {
        match (self.indices.get(i), self.indices.get(j)) {
            (Some(a), Some(b)) => a.iter().filter(|v| b.contains(v)).count(),
            _ => 0,
        }
    }
}

/// Squared length below which a crossing between triangles that share a
/// vertex is treated as just the shared corner.
pub const SHARED_VERTEX_EPSILON: f64 = 1e-5;

/// Length of the segment along which two non-coplanar triangles cross.
///
/// `None` when they do not touch or are (nearly) coplanar.
pub fn intersection_length(t1: &Triangle, t2: &Triangle) -> Option<f64> {
    let n1 = t1.normal()?;
    let n2 = t2.normal()?;
    let line = n1.cross(&n2);
    if line.norm_squared() < 1e-12 {
        return None;
    }
    let line = line.normalize();

    let (lo1, hi1) = plane_crossing_interval(t1, t2.v0, &n2, &line)?;
    let (lo2, hi2) = plane_crossing_interval(t2, t1.v0, &n1, &line)?;
    let lo = lo1.max(lo2);
    let hi = hi1.min(hi2);
    (hi >= lo - BVH_EPSILON).then(|| (hi - lo).max(0.0))
}

/// Interval, as parameters along `line`, where `tri` meets the plane through
/// `origin` with normal `normal`.
fn plane_crossing_interval(
    tri: &Triangle,
    origin: Point3<f64>,
    normal: &Vector3<f64>,
    line: &Vector3<f64>,
) -> Option<(f64, f64)> {
    let verts = tri.vertices();
    let dist = verts.map(|v| normal.dot(&(v - origin)));
    let mut params = Vec::with_capacity(3);

    for k in 0..3 {
        let (a, b) = (k, (k + 1) % 3);
        if dist[a].abs() <= BVH_EPSILON {
            params.push(line.dot(&verts[a].coords));
        }
        if (dist[a] > BVH_EPSILON && dist[b] < -BVH_EPSILON)
            || (dist[a] < -BVH_EPSILON && dist[b] > BVH_EPSILON)
        {
            let t = dist[a] / (dist[a] - dist[b]);
            let p = verts[a] + (verts[b] - verts[a]) * t;
            params.push(line.dot(&p.coords));
        }
    }

    let lo = params.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = params.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo <= hi).then_some((lo, hi))
}

/// Möller–Trumbore ray-triangle intersection.
/// Returns the distance along the ray for hits in front of the origin.
pub fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
) -> Option<f64> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray is parallel to triangle
    if a.abs() < BVH_EPSILON * edge1.norm() * edge2.norm() {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > BVH_EPSILON).then_some(t)
}

/// Separating axis test between two triangles.
pub fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let n1 = t1.normal_unnormalized();
    let n2 = t2.normal_unnormalized();

    // Degenerate triangles don't intersect meaningfully
    if n1.norm_squared() < epsilon * epsilon || n2.norm_squared() < epsilon * epsilon {
        return false;
    }

    let edges1 = [t1.v1 - t1.v0, t1.v2 - t1.v1, t1.v0 - t1.v2];
    let edges2 = [t2.v1 - t2.v0, t2.v2 - t2.v1, t2.v0 - t2.v2];

    let cross_normals = n1.cross(&n2);
    let is_coplanar =
        cross_normals.norm_squared() < epsilon * epsilon * n1.norm_squared() * n2.norm_squared();

    if is_coplanar {
        if separated_by_axis(&n1, t1, t2, epsilon) {
            return false;
        }
        // In-plane edge normals of both triangles
        let in_plane = edges1
            .iter()
            .map(|e| n1.cross(e))
            .chain(edges2.iter().map(|e| n2.cross(e)));
        for axis in in_plane {
            if axis.norm_squared() > epsilon * epsilon && separated_by_axis(&axis, t1, t2, epsilon)
            {
                return false;
            }
        }
        return true;
    }

    if separated_by_axis(&n1, t1, t2, epsilon) || separated_by_axis(&n2, t1, t2, epsilon) {
        return false;
    }

    for e1 in &edges1 {
        for e2 in &edges2 {
            let axis = e1.cross(e2);
            if axis.norm_squared() > epsilon * epsilon && separated_by_axis(&axis, t1, t2, epsilon)
            {
                return false;
            }
        }
    }

    true
}

fn separated_by_axis(axis: &Vector3<f64>, t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let project = |t: &Triangle| {
        let p = t.vertices().map(|v| axis.dot(&v.coords));
        (p[0].min(p[1]).min(p[2]), p[0].max(p[1]).max(p[2]))
    };
    let (min1, max1) = project(t1);
    let (min2, max2) = project(t2);
    max1 + epsilon < min2 || max2 + epsilon < min1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        )
    }

    #[test]
    fn test_ray_triangle_hit_and_miss() {
        let t = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let down = Vector3::new(0.0, 0.0, -1.0);
        let hit = ray_triangle_intersect(&Point3::new(0.2, 0.2, 1.0), &down, &t);
        assert!((hit.unwrap() - 1.0).abs() < 1e-12);
        assert!(ray_triangle_intersect(&Point3::new(2.0, 2.0, 1.0), &down, &t).is_none());
        // behind the origin
        assert!(ray_triangle_intersect(&Point3::new(0.2, 0.2, -1.0), &down, &t).is_none());
    }

    #[test]
    fn test_ray_cast_returns_nearest() {
        let bvh = TriangleBvh::new(vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([0.0, 0.0, 0.5], [1.0, 0.0, 0.5], [0.0, 1.0, 0.5]),
            tri([0.0, 0.0, -0.5], [1.0, 0.0, -0.5], [0.0, 1.0, -0.5]),
        ]);
        let down = Vector3::new(0.0, 0.0, -1.0);
        let hit = bvh
            .ray_cast(&Point3::new(0.1, 0.1, 2.0), &down, f64::INFINITY, None)
            .unwrap();
        assert_eq!(hit.triangle, 1);
        assert!((hit.distance - 1.5).abs() < 1e-12);

        let skipped = bvh
            .ray_cast(&Point3::new(0.1, 0.1, 2.0), &down, f64::INFINITY, Some(1))
            .unwrap();
        assert_eq!(skipped.triangle, 0);

        assert!(
            bvh.ray_cast(&Point3::new(0.1, 0.1, 2.0), &down, 1.0, None)
                .is_none()
        );
    }

    #[test]
    fn test_axis_aligned_ray_in_slab_plane() {
        let aabb = Aabb {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        let dir: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);
        let inv = dir.map(|d| 1.0 / d);
        assert!(aabb.ray_intersect(&Point3::new(0.0, 0.5, 3.0), &inv).is_some());
        assert!(aabb.ray_intersect(&Point3::new(2.0, 0.5, 3.0), &inv).is_none());
    }

    #[test]
    fn test_crossing_triangles_intersect() {
        let a = tri([-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([0.0, 0.0, -1.0], [0.0, 0.0, 1.0], [0.0, 2.0, 0.0]);
        assert!(triangles_intersect(&a, &b, BVH_EPSILON));

        let far = tri([5.0, 5.0, 5.0], [6.0, 5.0, 5.0], [5.0, 6.0, 5.0]);
        assert!(!triangles_intersect(&a, &far, BVH_EPSILON));
    }

    #[test]
    fn test_coplanar_disjoint_triangles() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [2.0, 1.0, 0.0]);
        assert!(!triangles_intersect(&a, &b, BVH_EPSILON));
        let c = tri([0.2, 0.2, 0.0], [1.2, 0.2, 0.0], [0.2, 1.2, 0.0]);
        assert!(triangles_intersect(&a, &c, BVH_EPSILON));
    }

    #[test]
    fn test_self_overlap_skips_neighbours() {
        let mesh = Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.25, 0.25, -1.0],
                [0.25, 0.25, 1.0],
                [0.25, 0.5, 0.0],
            ],
            vec![vec![0, 1, 2], vec![1, 3, 2], vec![4, 5, 6]],
        );
        let bvh = TriangleBvh::from_mesh(&mesh);
        assert_eq!(bvh.self_overlap(), vec![(0, 2)]);
    }

    #[test]
    fn test_shared_corner_needs_a_real_crossing() {
        // Two triangles meeting only at vertex 0
        let touching = Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [-1.0, 0.0, 1.0],
                [0.0, -1.0, 1.0],
            ],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        );
        assert!(TriangleBvh::from_mesh(&touching).self_overlap().is_empty());

        // Second triangle pierces the first through the shared corner
        let piercing = Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 1.0],
                [1.0, 1.0, -1.0],
            ],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        );
        assert_eq!(
            TriangleBvh::from_mesh(&piercing).self_overlap(),
            vec![(0, 1)]
        );
    }
}
