//! Overhang detection.
//!
//! The build plate is below the part: the down vector is fixed at
//! `(0, 0, -1)`. A face overhangs when its normal is within
//! `π/2 - limit_angle` of straight down.

use nalgebra::{UnitQuaternion, Vector3};
use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::info;

use crate::error::{CheckResult, require_in_range};
use crate::finding::{ElementKind, Finding};
use crate::orientation::OrientationScore;
use crate::tracing_ext::{OperationTimer, log_finding};
use crate::types::Mesh;

pub const LABEL_OVERHANG: &str = "Overhang Face";
pub const LABEL_SKIP_OVERHANG: &str = "Skipping Overhang";

/// World-space direction towards the build plate.
pub const DOWN: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);

/// Result of an overhang check.
#[derive(Debug, Clone, PartialEq)]
pub enum OverhangOutcome {
    /// Faces leaning past the limit.
    Checked(Finding),
    /// `limit_angle` was π/2: every face would pass, nothing was evaluated.
    Skipped,
}

impl OverhangOutcome {
    /// The checked finding, or a scalar "Skipping Overhang" entry.
    pub fn into_finding(self) -> Finding {
        match self {
            OverhangOutcome::Checked(finding) => finding,
            OverhangOutcome::Skipped => Finding::scalar(LABEL_SKIP_OVERHANG),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, OverhangOutcome::Skipped)
    }
}

/// Angle above which a face normal no longer counts as overhanging.
pub fn overhang_threshold(limit_angle: f64) -> f64 {
    FRAC_PI_2 - limit_angle
}

/// Find faces whose normal points within `π/2 - limit_angle` of straight down.
///
/// `limit_angle` is in radians, within `[0, π/2]`. At exactly `π/2` the check
/// is skipped and a scalar "Skipping Overhang" finding is returned.
///
/// # Example
///
/// ```
/// use mesh_printcheck::Mesh;
/// use mesh_printcheck::overhang::check_overhang;
/// use nalgebra::Point3;
///
/// // One triangle facing straight down.
/// let mesh = Mesh::from_triangles(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///     ],
///     &[[0, 1, 2]],
/// )
/// .unwrap();
///
/// let finding = check_overhang(&mesh, 45f64.to_radians()).unwrap();
/// assert_eq!(finding.indices(), &[0]);
/// ```
pub fn check_overhang(mesh: &Mesh, limit_angle: f64) -> CheckResult<Finding> {
    evaluate_overhang(mesh, limit_angle).map(OverhangOutcome::into_finding)
}

/// [`check_overhang`], keeping the skipped case distinct.
pub fn evaluate_overhang(mesh: &Mesh, limit_angle: f64) -> CheckResult<OverhangOutcome> {
    require_in_range("limit_angle", limit_angle, 0.0, FRAC_PI_2)?;
    if limit_angle == FRAC_PI_2 {
        info!("Overhang limit is 90 degrees, skipping");
        return Ok(OverhangOutcome::Skipped);
    }
    let _timer = OperationTimer::with_context("check_overhang", mesh);

    let threshold = overhang_threshold(limit_angle);
    let rotation = UnitQuaternion::identity();
    let faces: Vec<u32> = face_down_angles(mesh, &rotation)
        .into_iter()
        .enumerate()
        .filter(|(_, angle)| angle.is_some_and(|a| a < threshold))
        .map(|(i, _)| i as u32)
        .collect();

    let finding = Finding::new(LABEL_OVERHANG, ElementKind::Face, faces, mesh.face_count());
    log_finding(&finding);
    Ok(OverhangOutcome::Checked(finding))
}

/// Score of the mesh rotated by `rotation`: overhanging face count and the
/// smallest angle of any face normal to the down vector.
///
/// Faces without area are ignored. With no scored faces the minimum angle is π.
/// `limit_angle` is not validated here; callers check it once up front.
pub fn overhang_score(
    mesh: &Mesh,
    rotation: &UnitQuaternion<f64>,
    limit_angle: f64,
) -> OrientationScore {
    let threshold = overhang_threshold(limit_angle);
    let (overhang_count, min_angle) = face_down_angles(mesh, rotation)
        .into_iter()
        .flatten()
        .fold((0usize, PI), |(count, min), angle| {
            (count + usize::from(angle < threshold), min.min(angle))
        });
    OrientationScore {
        overhang_count,
        min_angle,
    }
}

/// Angle between each rotated face normal and [`DOWN`], in face order.
/// `None` for faces without area.
pub fn face_down_angles(mesh: &Mesh, rotation: &UnitQuaternion<f64>) -> Vec<Option<f64>> {
    mesh.faces()
        .par_iter()
        .map(|face| face.unit_normal().map(|n| (rotation * n).angle(&DOWN)))
        .collect()
}

impl Mesh {
    /// Run [`check_overhang`] on this mesh.
    pub fn check_overhang(&self, limit_angle: f64) -> CheckResult<Finding> {
        check_overhang(self, limit_angle)
    }
}
