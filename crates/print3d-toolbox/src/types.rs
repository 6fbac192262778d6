//! Core mesh data types.
//!
//! Meshes are polygonal: each face is an ordered loop of vertex indices with
//! counter-clockwise winding seen from outside. Edges are implicit, derived
//! from polygon sides, plus an explicit list of loose (wire) edges that belong
//! to no face.

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::triangulate::triangulate_polygon;

/// RGB color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl VertexColor {
    #[inline]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to floating point values in [0, 1] range.
    #[inline]
    pub fn to_float(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// A vertex with optional per-vertex data layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Unit normal, when loaded from a file or computed from faces.
    pub normal: Option<Vector3<f64>>,

    /// Vertex color (RGB).
    pub color: Option<VertexColor>,
}

impl Vertex {
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
            color: None,
        }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Bounding box of a point set, `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bb.min = bb.min.inf(p);
            bb.max = bb.max.sup(p);
        }
        Some(bb)
    }

    /// `(min_x, max_x, min_y, max_y, min_z, max_z)`.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        )
    }

    #[inline]
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// The eight corners, x varying slowest.
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }
}

/// A polygon mesh with indexed vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Polygons as loops of vertex indices, at least three each.
    pub faces: Vec<Vec<u32>>,

    /// Wire edges not bounding any face.
    pub loose_edges: Vec<[u32; 2]>,
}

/// Result of [`Mesh::triangulated`]: a triangle-only mesh plus, for every
/// triangle, the index of the polygon it was cut from.
#[derive(Debug, Clone)]
pub struct TriangulatedMesh {
    pub mesh: Mesh,
    pub face_map: Vec<usize>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            loose_edges: Vec::new(),
        }
    }

    /// Build a mesh from positions and polygons.
    pub fn from_parts(positions: &[[f64; 3]], faces: Vec<Vec<u32>>) -> Self {
        Self {
            vertices: positions
                .iter()
                .map(|p| Vertex::from_coords(p[0], p[1], p[2]))
                .collect(),
            faces,
            loose_edges: Vec::new(),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when the mesh has no vertices at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// True when every face is a triangle.
    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    #[inline]
    pub fn position(&self, v: u32) -> Point3<f64> {
        self.vertices[v as usize].position
    }

    /// Compute the axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        self.bounding_box().map(|bb| (bb.min, bb.max))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Corner positions of a face.
    pub fn face_positions(&self, face_idx: usize) -> Vec<Point3<f64>> {
        self.faces[face_idx]
            .iter()
            .map(|&v| self.position(v))
            .collect()
    }

    /// Unnormalized polygon normal; its length is twice the polygon area.
    pub fn face_normal_unnormalized(&self, face_idx: usize) -> Vector3<f64> {
        polygon_area_vector(&self.face_positions(face_idx))
    }

    /// Unit polygon normal, `None` for zero-area faces.
    pub fn face_normal(&self, face_idx: usize) -> Option<Vector3<f64>> {
        let n = self.face_normal_unnormalized(face_idx);
        let len = n.norm();
        (len > f64::EPSILON).then(|| n / len)
    }

    pub fn face_area(&self, face_idx: usize) -> f64 {
        self.face_normal_unnormalized(face_idx).norm() * 0.5
    }

    /// Median center: mean of the corner positions.
    pub fn face_center(&self, face_idx: usize) -> Point3<f64> {
        let face = &self.faces[face_idx];
        let sum = face
            .iter()
            .fold(Vector3::zeros(), |acc, &v| acc + self.position(v).coords);
        Point3::from(sum / face.len().max(1) as f64)
    }

    /// Translate mesh by the given vector.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Scale mesh uniformly around the origin.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.position.coords *= factor;
        }
    }

    /// Apply an affine transform. Normals go through the inverse transpose
    /// and faces are reversed when the transform mirrors.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear.try_inverse().map(|m| m.transpose());
        for vertex in &mut self.vertices {
            vertex.position = matrix.transform_point(&vertex.position);
            if let (Some(n), Some(nm)) = (vertex.normal.as_mut(), normal_matrix.as_ref()) {
                let t = nm * *n;
                *n = t.try_normalize(f64::EPSILON).unwrap_or(t);
            }
        }
        if linear.determinant() < 0.0 {
            for face in &mut self.faces {
                flip_polygon(face);
            }
        }
    }

    /// Signed volume via the divergence theorem over fan-split polygons.
    ///
    /// Positive for closed meshes with outward normals. Meaningless for open
    /// meshes.
    pub fn signed_volume(&self) -> f64 {
        let mut volume = 0.0;
        for face in &self.faces {
            if face.len() < 3 {
                continue;
            }
            let v0 = self.position(face[0]).coords;
            for i in 1..face.len() - 1 {
                let v1 = self.position(face[i]).coords;
                let v2 = self.position(face[i + 1]).coords;
                volume += v0.dot(&v1.cross(&v2));
            }
        }
        volume / 6.0
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Sum of polygon areas.
    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.face_area(f)).sum()
    }

    /// Recompute area-weighted vertex normals from the faces.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::zeros(); self.vertices.len()];
        for face_idx in 0..self.faces.len() {
            let n = self.face_normal_unnormalized(face_idx);
            for &v in &self.faces[face_idx] {
                sums[v as usize] += n;
            }
        }
        for (vertex, n) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = n.try_normalize(f64::EPSILON);
        }
    }

    /// Split every polygon into triangles.
    ///
    /// Vertices are shared with the source; loose edges are dropped.
    pub fn triangulated(&self) -> TriangulatedMesh {
        let mut faces = Vec::with_capacity(self.faces.len());
        let mut face_map = Vec::with_capacity(self.faces.len());
        for (face_idx, face) in self.faces.iter().enumerate() {
            if face.len() == 3 {
                faces.push(face.clone());
                face_map.push(face_idx);
                continue;
            }
            for [a, b, c] in triangulate_polygon(&self.face_positions(face_idx)) {
                faces.push(vec![face[a], face[b], face[c]]);
                face_map.push(face_idx);
            }
        }
        TriangulatedMesh {
            mesh: Mesh {
                vertices: self.vertices.clone(),
                faces,
                loose_edges: Vec::new(),
            },
            face_map,
        }
    }

    /// Iterate over triangles of an already triangulated mesh.
    ///
    /// Polygons with more than three corners contribute their first three.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|f| Triangle {
            v0: self.position(f[0]),
            v1: self.position(f[1]),
            v2: self.position(f[2]),
        })
    }

    /// Append another mesh, offsetting its indices.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().cloned());
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| f.iter().map(|&v| v + offset).collect()),
        );
        self.loose_edges
            .extend(other.loose_edges.iter().map(|e| [e[0] + offset, e[1] + offset]));
    }

    /// Drop vertices referenced by no face and no loose edge.
    ///
    /// Returns the number of vertices removed.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for &v in self.faces.iter().flatten() {
            used[v as usize] = true;
        }
        for e in &self.loose_edges {
            used[e[0] as usize] = true;
            used[e[1] as usize] = true;
        }
        self.retain_vertices(&used)
    }

    /// Keep only vertices flagged in `keep`, remapping faces and edges.
    ///
    /// Faces or edges that reference a dropped vertex are removed as well.
    pub fn retain_vertices(&mut self, keep: &[bool]) -> usize {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut next = 0u32;
        for (i, &k) in keep.iter().enumerate() {
            if k {
                remap[i] = next;
                next += 1;
            }
        }
        let removed = self.vertices.len() - next as usize;
        if removed == 0 {
            return 0;
        }

        let mut idx = 0;
        self.vertices.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        self.faces.retain_mut(|face| {
            for v in face.iter_mut() {
                *v = remap[*v as usize];
            }
            !face.contains(&u32::MAX)
        });
        self.loose_edges.retain_mut(|e| {
            e[0] = remap[e[0] as usize];
            e[1] = remap[e[1] as usize];
            e[0] != u32::MAX && e[1] != u32::MAX
        });
        removed
    }
}

/// Reverse a polygon's winding, keeping its first corner in place.
pub fn flip_polygon(face: &mut [u32]) {
    if face.len() > 2 {
        face[1..].reverse();
    }
}

/// Sum of fan cross products; its length is twice the polygon area and its
/// direction the polygon normal. Robust for non-planar loops.
pub fn polygon_area_vector(points: &[Point3<f64>]) -> Vector3<f64> {
    if points.len() < 3 {
        return Vector3::zeros();
    }
    let origin = points[0];
    let mut n = Vector3::zeros();
    for i in 1..points.len() - 1 {
        n += (points[i] - origin).cross(&(points[i + 1] - origin));
    }
    n
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Face normal via cross product, right-hand rule with CCW winding.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit face normal, `None` for degenerate triangles.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON * f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}
