//! Polygon triangulation by ear clipping.

use nalgebra::{Point3, Vector3};
use tracing::warn;

use crate::types::polygon_area_vector;

/// Triangulate a polygon loop, returning corner index triples.
///
/// Ears are clipped in the plane of the polygon normal. When no ear can be
/// found (self-overlapping or strongly warped loops) the remainder is closed
/// with a fan from its first corner.
pub fn triangulate_polygon(points: &[Point3<f64>]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let normal = polygon_area_vector(points)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::z);

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let curr = remaining[i];
            let next = remaining[(i + 1) % len];
            is_ear(points, &remaining, prev, curr, next, &normal)
        });

        match ear {
            Some(i) => {
                let prev = remaining[(i + len - 1) % len];
                let next = remaining[(i + 1) % len];
                triangles.push([prev, remaining[i], next]);
                remaining.remove(i);
            }
            None => {
                warn!(
                    remaining = remaining.len(),
                    "Ear clipping stuck, closing polygon with a fan"
                );
                break;
            }
        }
    }

    for i in 1..remaining.len() - 1 {
        triangles.push([remaining[0], remaining[i], remaining[i + 1]]);
    }

    triangles
}

fn is_ear(
    points: &[Point3<f64>],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    normal: &Vector3<f64>,
) -> bool {
    let a = points[prev];
    let b = points[curr];
    let c = points[next];

    // Reflex or collinear corners are not ears.
    let turn = (b - a).cross(&(c - b));
    if turn.dot(normal) <= 0.0 {
        return false;
    }

    !remaining.iter().any(|&idx| {
        idx != prev
            && idx != curr
            && idx != next
            && points[idx] != a
            && points[idx] != b
            && points[idx] != c
            && point_in_triangle(&points[idx], &a, &b, &c, normal)
    })
}

/// Point-in-triangle test after projecting away the dominant normal axis.
pub(crate) fn point_in_triangle(
    p: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    let abs = normal.abs();
    let project = |q: &Point3<f64>| -> (f64, f64) {
        if abs.z >= abs.x && abs.z >= abs.y {
            (q.x, q.y)
        } else if abs.y >= abs.x {
            (q.x, q.z)
        } else {
            (q.y, q.z)
        }
    };

    let (p, a, b, c) = (project(p), project(v0), project(v1), project(v2));
    let sign = |p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)| -> f64 {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };

    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_neg && has_pos)
}
