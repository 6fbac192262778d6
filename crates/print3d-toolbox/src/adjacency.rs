//! Edge table and vertex classification.
//!
//! Edges are enumerated in a fixed order so that edge indices are stable for a
//! given topology: polygon sides in face order (first appearance wins), then
//! loose edges that are not already a polygon side.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::types::Mesh;

/// An undirected edge and the faces that use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Endpoints, smaller index first.
    pub verts: [u32; 2],
    /// Incident faces. A face using the edge twice appears twice.
    pub faces: Vec<usize>,
}

/// All edges of a mesh with edge-to-face incidence.
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    edges: Vec<Edge>,
    lookup: HashMap<(u32, u32), usize>,
}

#[inline]
pub fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

impl EdgeTable {
    #[must_use]
    pub fn build(mesh: &Mesh) -> Self {
        let mut table = Self::default();

        for (face_idx, face) in mesh.faces.iter().enumerate() {
            let n = face.len();
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                if a == b {
                    continue;
                }
                let e = table.insert(a, b);
                table.edges[e].faces.push(face_idx);
            }
        }
        for &[a, b] in &mesh.loose_edges {
            if a != b {
                table.insert(a, b);
            }
        }

        table
    }

    fn insert(&mut self, a: u32, b: u32) -> usize {
        let key = normalize_edge(a, b);
        let next = self.edges.len();
        let idx = *self.lookup.entry(key).or_insert(next);
        if idx == next {
            self.edges.push(Edge {
                verts: [key.0, key.1],
                faces: Vec::new(),
            });
        }
        idx
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    /// Index of the edge joining `a` and `b`, in either direction.
    pub fn find(&self, a: u32, b: u32) -> Option<usize> {
        self.lookup.get(&normalize_edge(a, b)).copied()
    }

    pub fn faces_for_edge(&self, idx: usize) -> &[usize] {
        &self.edges[idx].faces
    }

    /// Exactly two incident faces.
    #[inline]
    pub fn is_manifold(&self, idx: usize) -> bool {
        self.edges[idx].faces.len() == 2
    }

    /// Exactly one incident face.
    #[inline]
    pub fn is_boundary(&self, idx: usize) -> bool {
        self.edges[idx].faces.len() == 1
    }

    /// No incident face.
    #[inline]
    pub fn is_wire(&self, idx: usize) -> bool {
        self.edges[idx].faces.is_empty()
    }

    /// A manifold edge whose two faces traverse it in opposite directions.
    pub fn is_contiguous(&self, idx: usize, mesh: &Mesh) -> bool {
        let edge = &self.edges[idx];
        if edge.faces.len() != 2 {
            return false;
        }
        let [a, b] = edge.verts;
        let d0 = edge_direction_in_face(&mesh.faces[edge.faces[0]], a, b);
        let d1 = edge_direction_in_face(&mesh.faces[edge.faces[1]], a, b);
        matches!((d0, d1), (Some(x), Some(y)) if x != y)
    }

    pub fn edge_length(&self, idx: usize, mesh: &Mesh) -> f64 {
        let [a, b] = self.edges[idx].verts;
        (mesh.position(a) - mesh.position(b)).norm()
    }

    /// Edge indices incident to each vertex.
    pub fn vertex_edges(&self, vertex_count: usize) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); vertex_count];
        for (i, e) in self.edges.iter().enumerate() {
            out[e.verts[0] as usize].push(i);
            out[e.verts[1] as usize].push(i);
        }
        out
    }
}

/// Whether edge `a -> b` appears in the face in that direction.
///
/// `Some(true)` for `a -> b`, `Some(false)` for `b -> a`, `None` if absent.
pub fn edge_direction_in_face(face: &[u32], a: u32, b: u32) -> Option<bool> {
    let n = face.len();
    for i in 0..n {
        let (v0, v1) = (face[i], face[(i + 1) % n]);
        if v0 == a && v1 == b {
            return Some(true);
        }
        if v0 == b && v1 == a {
            return Some(false);
        }
    }
    None
}

/// Which kinds of non-manifold vertex to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonManifoldSelect {
    /// Vertices on wire edges.
    pub wire: bool,
    /// Vertices on one-face edges.
    pub boundary: bool,
    /// Isolated vertices, vertices on edges with more than two faces, and
    /// vertices joining several separate face fans.
    pub verts: bool,
}

impl NonManifoldSelect {
    pub const ALL: Self = Self {
        wire: true,
        boundary: true,
        verts: true,
    };
}

/// Flag vertices matching the requested non-manifold kinds.
pub fn non_manifold_vertices(mesh: &Mesh, table: &EdgeTable, select: NonManifoldSelect) -> Vec<bool> {
    let n = mesh.vertex_count();
    let mut flags = vec![false; n];

    for (idx, edge) in table.edges().iter().enumerate() {
        let hit = (select.wire && table.is_wire(idx))
            || (select.boundary && table.is_boundary(idx))
            || (select.verts && (edge.faces.len() > 2 || table.is_wire(idx)));
        if hit {
            flags[edge.verts[0] as usize] = true;
            flags[edge.verts[1] as usize] = true;
        }
    }

    if select.verts {
        let vertex_edges = table.vertex_edges(n);
        let mut vertex_faces = vec![Vec::new(); n];
        for (f, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                if vertex_faces[v as usize].last() != Some(&f) {
                    vertex_faces[v as usize].push(f);
                }
            }
        }

        for v in 0..n {
            if flags[v] {
                continue;
            }
            if vertex_edges[v].is_empty() {
                flags[v] = true;
                continue;
            }
            if fan_count(&vertex_faces[v], &vertex_edges[v], table) > 1 {
                flags[v] = true;
            }
        }
    }

    flags
}

/// Number of edge-connected groups among the faces around a vertex.
fn fan_count(faces: &[usize], edges: &[usize], table: &EdgeTable) -> usize {
    if faces.len() <= 1 {
        return faces.len();
    }
    let mut parent: Vec<usize> = (0..faces.len()).collect();
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for &e in edges {
        let incident = table.faces_for_edge(e);
        let mut first: Option<usize> = None;
        for f in incident {
            let Some(pos) = faces.iter().position(|x| x == f) else {
                continue;
            };
            match first {
                None => first = Some(pos),
                Some(p) => {
                    let (ra, rb) = (root(&mut parent, p), root(&mut parent, pos));
                    parent[ra] = rb;
                }
            }
        }
    }

    (0..faces.len())
        .filter(|&i| root(&mut parent, i) == i)
        .count()
}

/// Fingerprint of a mesh's topology, independent of vertex positions.
///
/// Used to detect reports that no longer match the mesh they were computed on.
/// The key is a 64-bit FNV-1a over little-endian `u64` words: the vertex
/// count, the face count, each face as its length then its indices, the loose
/// edge count, then each loose edge. It is stable across builds and
/// platforms, so saved reports stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyKey(pub u64);

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

struct Fnv1a(u64);

impl Fnv1a {
    fn word(&mut self, value: u64) {
        for byte in value.to_le_bytes() {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}

impl TopologyKey {
    pub fn of(mesh: &Mesh) -> Self {
        let mut hash = Fnv1a(FNV_OFFSET_BASIS);
        hash.word(mesh.vertex_count() as u64);
        hash.word(mesh.faces.len() as u64);
        for face in &mesh.faces {
            hash.word(face.len() as u64);
            face.iter().for_each(|&v| hash.word(u64::from(v)));
        }
        hash.word(mesh.loose_edges.len() as u64);
        for &[a, b] in &mesh.loose_edges {
            hash.word(u64::from(a));
            hash.word(u64::from(b));
        }
        Self(hash.0)
    }
}
