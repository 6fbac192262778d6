//! Rim faces joining the two surfaces of a solidified sheet.

use tracing::{debug, info};

use print3d_toolbox::{EdgeTable, Mesh, boundary_loops};

/// Result of rim generation.
#[derive(Debug, Clone, Default)]
pub struct RimResult {
    /// One quad per boundary edge.
    pub faces: Vec<Vec<u32>>,
    /// Number of boundary loops that got a rim.
    pub loops: usize,
    /// Total boundary edges walked.
    pub boundary_edges: usize,
}

/// Build rim quads for every boundary loop of `sheet`.
///
/// The solidified mesh stores the back surface at the original vertex
/// indices (faces reversed) and the front surface at `index + offset`
/// (faces as in `sheet`). Each boundary edge `a -> b`, oriented the way a
/// fill face would run, yields the quad `a' b' b a` where `x' = x + offset`,
/// which winds consistently with both surfaces.
pub fn generate_rim(sheet: &Mesh, offset: u32) -> RimResult {
    let table = EdgeTable::build(sheet);
    let loops = boundary_loops(sheet, &table);

    let mut result = RimResult {
        loops: loops.len(),
        ..Default::default()
    };

    for boundary in &loops {
        let n = boundary.vertices.len();
        result.boundary_edges += n;
        for i in 0..n {
            let a = boundary.vertices[i];
            let b = boundary.vertices[(i + 1) % n];
            result.faces.push(vec![a + offset, b + offset, b, a]);
        }
        debug!(edges = n, "rim loop");
    }

    info!(
        loops = result.loops,
        faces = result.faces.len(),
        "rim generated"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_square() -> Mesh {
        Mesh::from_parts(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    /// 3x3 grid of quads with the center one missing.
    fn square_with_hole() -> Mesh {
        let mut positions = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                positions.push([i as f64, j as f64, 0.0]);
            }
        }
        let mut faces = Vec::new();
        for j in 0..3u32 {
            for i in 0..3u32 {
                if i == 1 && j == 1 {
                    continue;
                }
                let a = j * 4 + i;
                faces.push(vec![a, a + 1, a + 5, a + 4]);
            }
        }
        Mesh::from_parts(&positions, faces)
    }

    #[test]
    fn test_single_loop_rim() {
        let rim = generate_rim(&open_square(), 4);
        assert_eq!(rim.loops, 1);
        assert_eq!(rim.boundary_edges, 4);
        assert_eq!(rim.faces.len(), 4);
        for face in &rim.faces {
            assert_eq!(face.iter().filter(|&&v| v >= 4).count(), 2);
        }
    }

    #[test]
    fn test_rim_runs_against_front_faces() {
        // the front copy holds 4 -> 5, so the rim must run 5 -> 4
        let rim = generate_rim(&open_square(), 4);
        let runs_forward = rim.faces.iter().any(|f| {
            (0..4).any(|i| f[i] == 4 && f[(i + 1) % 4] == 5)
        });
        assert!(!runs_forward);
    }

    #[test]
    fn test_inner_hole_gets_its_own_loop() {
        let rim = generate_rim(&square_with_hole(), 16);
        assert_eq!(rim.loops, 2);
        assert_eq!(rim.boundary_edges, 16);
    }

    #[test]
    fn test_closed_mesh_has_no_rim() {
        let mesh = Mesh::from_parts(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
        );
        let rim = generate_rim(&mesh, 4);
        assert_eq!(rim.loops, 0);
        assert!(rim.faces.is_empty());
    }
}
