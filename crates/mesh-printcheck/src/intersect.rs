//! Self-intersection detection.
//!
//! Candidate triangle pairs come from the BVH's box-overlap traversal.
//! Pairs from the same face, or from faces that share a vertex, are
//! skipped; the rest get an exact separating-axis test. Every face with at
//! least one intersecting triangle is reported.

use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::bvh::Bvh;
use crate::finding::{ElementKind, Finding};
use crate::tracing_ext::{OperationTimer, log_finding};
use crate::types::{Mesh, Triangle};

pub const LABEL_INTERSECT: &str = "Intersect Face";

/// Relative tolerance for the separating-axis test, as a fraction of the
/// longest edge of the pair.
pub const INTERSECT_EPSILON: f64 = 1e-10;

/// Find faces that intersect another, non-adjacent face.
pub fn check_self_intersect(mesh: &Mesh) -> Finding {
    let bvh = Bvh::build(mesh);
    check_self_intersect_with(mesh, &bvh)
}

/// [`check_self_intersect`] with a prebuilt BVH of `mesh`.
pub fn check_self_intersect_with(mesh: &Mesh, bvh: &Bvh) -> Finding {
    let _timer = OperationTimer::with_context("check_self_intersect", mesh);

    let mut faces = Vec::new();
    for (a, b) in intersecting_face_pairs(mesh, bvh) {
        faces.push(a);
        faces.push(b);
    }

    let finding = Finding::new(LABEL_INTERSECT, ElementKind::Face, faces, mesh.face_count());
    log_finding(&finding);
    finding
}

/// Every pair of non-adjacent faces whose geometry intersects, as `(a, b)`
/// with `a < b`, sorted and deduplicated.
pub fn intersecting_face_pairs(mesh: &Mesh, bvh: &Bvh) -> Vec<(u32, u32)> {
    let rebuilt;
    let bvh = if bvh.len() == mesh.triangle_count() {
        bvh
    } else {
        warn!(
            bvh_triangles = bvh.len(),
            mesh_triangles = mesh.triangle_count(),
            "BVH does not match mesh, rebuilding"
        );
        rebuilt = Bvh::build(mesh);
        &rebuilt
    };

    if mesh.face_count() < 2 {
        return Vec::new();
    }
    info!(
        faces = mesh.face_count(),
        triangles = mesh.triangle_count(),
        "Checking for self-intersections"
    );

    let candidates = bvh.overlapping_pairs();
    debug!(candidates = candidates.len(), "Testing candidate triangle pairs");

    let mut pairs: Vec<(u32, u32)> = candidates
        .par_iter()
        .filter_map(|&(ta, tb)| {
            let fa = mesh.triangle_face(ta);
            let fb = mesh.triangle_face(tb);
            if fa == fb || mesh.faces_share_vertex(fa as usize, fb as usize) {
                return None;
            }
            if triangles_intersect(bvh.triangle(ta), bvh.triangle(tb), INTERSECT_EPSILON) {
                Some((fa.min(fb), fa.max(fb)))
            } else {
                None
            }
        })
        .collect();

    pairs.sort_unstable();
    pairs.dedup();
    if !pairs.is_empty() {
        warn!(pairs = pairs.len(), "Found intersecting face pairs");
    }
    pairs
}

/// Exact triangle-triangle test by separating axes.
///
/// Touching triangles count as intersecting. Degenerate triangles never
/// intersect. `epsilon` is relative: axes are normalized, and gaps are
/// compared against `epsilon` times the longest edge of the pair, so the
/// result does not depend on the mesh's units.
pub fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let edges1 = [t1.v1 - t1.v0, t1.v2 - t1.v1, t1.v0 - t1.v2];
    let edges2 = [t2.v1 - t2.v0, t2.v2 - t2.v1, t2.v0 - t2.v2];
    let longest1 = longest_edge(&edges1);
    let longest2 = longest_edge(&edges2);

    let n1 = t1.normal_unnormalized();
    let n2 = t2.normal_unnormalized();
    let (Some(u1), Some(u2)) = (
        unit_axis(&n1, longest1 * longest1, epsilon),
        unit_axis(&n2, longest2 * longest2, epsilon),
    ) else {
        return false;
    };

    let tolerance = epsilon * longest1.max(longest2);

    // Either plane separates the other triangle
    if separated_by_axis(&u1, t1, t2, tolerance) || separated_by_axis(&u2, t1, t2, tolerance) {
        return false;
    }

    let is_coplanar = u1.cross(&u2).norm() < epsilon;

    if is_coplanar {
        // 2D test: in-plane edge normals of both triangles
        let in_plane = edges1
            .iter()
            .map(|e| (u1.cross(e), e.norm()))
            .chain(edges2.iter().map(|e| (u2.cross(e), e.norm())));
        for (axis, len) in in_plane {
            if unit_axis(&axis, len, epsilon)
                .is_some_and(|axis| separated_by_axis(&axis, t1, t2, tolerance))
            {
                return false;
            }
        }
        return true;
    }

    for e1 in &edges1 {
        for e2 in &edges2 {
            if unit_axis(&e1.cross(e2), e1.norm() * e2.norm(), epsilon)
                .is_some_and(|axis| separated_by_axis(&axis, t1, t2, tolerance))
            {
                return false;
            }
        }
    }

    true
}

fn longest_edge(edges: &[Vector3<f64>; 3]) -> f64 {
    edges.iter().map(|e| e.norm()).fold(0.0, f64::max)
}

/// `axis` normalized, or `None` when it is negligible against `reference`,
/// the magnitude it would have if its factors were perpendicular.
fn unit_axis(axis: &Vector3<f64>, reference: f64, epsilon: f64) -> Option<Vector3<f64>> {
    let norm = axis.norm();
    (norm > epsilon * reference).then(|| axis / norm)
}

fn separated_by_axis(axis: &Vector3<f64>, t1: &Triangle, t2: &Triangle, tolerance: f64) -> bool {
    let project = |t: &Triangle| {
        let [a, b, c] = t.points().map(|p| axis.dot(&p.coords));
        (a.min(b).min(c), a.max(b).max(c))
    };
    let (min1, max1) = project(t1);
    let (min2, max2) = project(t2);

    max1 + tolerance < min2 || max2 + tolerance < min1
}

impl Mesh {
    /// Run [`check_self_intersect`] on this mesh.
    pub fn check_self_intersect(&self) -> Finding {
        check_self_intersect(self)
    }
}
