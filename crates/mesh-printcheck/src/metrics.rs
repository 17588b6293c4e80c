//! Single-pass metric checks: degenerate elements, distorted faces and
//! sharp edges.
//!
//! Each check scans faces or edges in parallel and compares one number per
//! element against a caller-supplied threshold.

use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::info;

use crate::error::{CheckResult, require_in_range, require_non_negative};
use crate::finding::{ElementKind, Finding};
use crate::tracing_ext::{OperationTimer, log_finding};
use crate::types::{Face, Mesh};

pub const LABEL_ZERO_FACES: &str = "Zero Faces";
pub const LABEL_ZERO_EDGES: &str = "Zero Edges";
pub const LABEL_NON_FLAT: &str = "Non-flat Faces";
pub const LABEL_SHARP: &str = "Sharp Edge";

/// Find faces with area ≤ `area_eps` and edges with length ≤ `length_eps`.
///
/// Returns `(faces, edges)`.
///
/// # Errors
///
/// [`crate::CheckError::InvalidParameter`] if either threshold is negative or NaN.
pub fn check_degenerate(
    mesh: &Mesh,
    area_eps: f64,
    length_eps: f64,
) -> CheckResult<(Finding, Finding)> {
    require_non_negative("area_eps", area_eps)?;
    require_non_negative("length_eps", length_eps)?;
    let _timer = OperationTimer::with_context("check_degenerate", mesh);

    let faces: Vec<u32> = mesh
        .faces()
        .par_iter()
        .enumerate()
        .filter(|(_, f)| f.area() <= area_eps)
        .map(|(i, _)| i as u32)
        .collect();

    let edges: Vec<u32> = (0..mesh.edge_count())
        .into_par_iter()
        .filter(|&i| mesh.edge_length(i) <= length_eps)
        .map(|i| i as u32)
        .collect();

    let faces = Finding::new(LABEL_ZERO_FACES, ElementKind::Face, faces, mesh.face_count());
    let edges = Finding::new(LABEL_ZERO_EDGES, ElementKind::Edge, edges, mesh.edge_count());
    log_finding(&faces);
    log_finding(&edges);
    Ok((faces, edges))
}

/// Find n-gons whose corners deviate from the face normal by more than
/// `angle_limit` radians.
///
/// Each corner's normal is the cross product of its two edges, flipped to
/// agree with the face normal at concave corners. Triangles are planar by
/// construction and never flagged; corners with collinear edges carry no
/// orientation and are skipped, as are faces without area.
///
/// # Errors
///
/// [`crate::CheckError::InvalidParameter`] if `angle_limit` is outside `[0, π]`.
pub fn check_nonplanar(mesh: &Mesh, angle_limit: f64) -> CheckResult<Finding> {
    require_in_range("angle_limit", angle_limit, 0.0, PI)?;
    let _timer = OperationTimer::with_context("check_nonplanar", mesh);

    let faces: Vec<u32> = mesh
        .faces()
        .par_iter()
        .enumerate()
        .filter(|(_, f)| face_distortion(mesh, f).is_some_and(|a| a > angle_limit))
        .map(|(i, _)| i as u32)
        .collect();

    let finding = Finding::new(LABEL_NON_FLAT, ElementKind::Face, faces, mesh.face_count());
    log_finding(&finding);
    Ok(finding)
}

/// Largest angle between a corner normal and the face normal.
///
/// `None` for triangles and faces without a normal.
pub fn face_distortion(mesh: &Mesh, face: &Face) -> Option<f64> {
    if face.len() <= 3 {
        return None;
    }
    let normal = face.unit_normal()?;
    let loop_ = face.vertices();
    let n = loop_.len();

    let mut worst: f64 = 0.0;
    for i in 0..n {
        let prev = mesh.position(loop_[(i + n - 1) % n]);
        let curr = mesh.position(loop_[i]);
        let next = mesh.position(loop_[(i + 1) % n]);

        let corner = (next - curr).cross(&(prev - curr));
        let Some(mut corner) = corner.try_normalize(f64::EPSILON) else {
            continue;
        };
        if corner.dot(&normal) < 0.0 {
            corner = -corner;
        }
        worst = worst.max(corner.angle(&normal));
    }
    Some(worst)
}

/// Signed dihedral angle across a two-face edge, in `[-π, π]`.
///
/// Zero for coplanar faces, positive across convex edges, negative across
/// concave ones. `None` for edges that are not manifold or touch a face
/// without area.
pub fn signed_dihedral_angle(mesh: &Mesh, edge: usize) -> Option<f64> {
    let edge = &mesh.edges()[edge];
    if !edge.is_manifold() {
        return None;
    }
    let [first, second] = [edge.uses()[0], edge.uses()[1]];
    let n1 = mesh.faces()[first.face as usize].unit_normal()?;
    let n2 = mesh.faces()[second.face as usize].unit_normal()?;

    let angle = n1.angle(&n2);
    if angle == 0.0 {
        return Some(0.0);
    }

    // Edge direction as walked by the first face.
    let [a, b] = edge.vertices();
    let (from, to) = if first.forward { (a, b) } else { (b, a) };
    let dir = mesh.position(to) - mesh.position(from);

    if n1.cross(&n2).dot(&dir) > 0.0 {
        Some(angle)
    } else {
        Some(-angle)
    }
}

/// Find manifold edges whose signed dihedral angle exceeds `angle_limit`.
///
/// # Errors
///
/// [`crate::CheckError::InvalidParameter`] if `angle_limit` is outside `[0, π]`.
pub fn check_sharp(mesh: &Mesh, angle_limit: f64) -> CheckResult<Finding> {
    require_in_range("angle_limit", angle_limit, 0.0, PI)?;
    let _timer = OperationTimer::with_context("check_sharp", mesh);
    info!(angle_limit = angle_limit.to_degrees(), "Checking sharp edges");

    let edges: Vec<u32> = (0..mesh.edge_count())
        .into_par_iter()
        .filter(|&i| signed_dihedral_angle(mesh, i).is_some_and(|a| a > angle_limit))
        .map(|i| i as u32)
        .collect();

    let finding = Finding::new(LABEL_SHARP, ElementKind::Edge, edges, mesh.edge_count());
    log_finding(&finding);
    Ok(finding)
}
