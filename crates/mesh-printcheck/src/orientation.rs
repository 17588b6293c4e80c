//! Orientation search for minimal overhang.
//!
//! # Algorithm
//!
//! Candidate rotations are spread evenly over the sphere of possible "up"
//! directions with a golden-angle spiral: candidate `i` of `n` tilts about X
//! by the latitude `π/2 - acos(1 - 2(i + 0.5)/n)` and turns about Y by
//! `i · golden_angle mod 2π`. Each candidate is applied on top of the base
//! rotation and scored by its overhang count, ties broken by the larger
//! minimum angle to the down vector.
//!
//! Candidates are scored in parallel and folded in generation order, so the
//! result does not depend on the thread count. The base rotation is scored
//! first and only a strictly better candidate replaces it.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, UnitQuaternion, Vector3};
use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use tracing::{debug, info, trace};

use crate::error::{CheckError, CheckResult, require_in_range};
use crate::overhang::{DOWN, overhang_score};
use crate::source::{MeshObject, build_with_matrix};
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// Golden angle in radians, `π(3 - √5)`.
pub fn golden_angle() -> f64 {
    PI * (3.0 - 5.0_f64.sqrt())
}

/// How well an orientation prints without support.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationScore {
    /// Faces leaning past the overhang limit.
    pub overhang_count: usize,
    /// Smallest angle between any face normal and the down vector.
    pub min_angle: f64,
}

impl OrientationScore {
    /// Strictly fewer overhangs, or as many with a larger minimum angle.
    pub fn better_than(&self, other: &OrientationScore) -> bool {
        self.overhang_count < other.overhang_count
            || (self.overhang_count == other.overhang_count && self.min_angle > other.min_angle)
    }
}

/// A rotation and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationCandidate {
    pub rotation: UnitQuaternion<f64>,
    pub score: OrientationScore,
}

/// Outcome of [`optimize_orientation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationResult {
    /// Best rotation found; the base rotation if nothing beat it.
    pub best: OrientationCandidate,
    /// The base rotation's own score.
    pub base: OrientationCandidate,
    /// Number of spiral candidates scored.
    pub evaluated: usize,
}

impl OrientationResult {
    /// True if a candidate beat the base rotation.
    pub fn improved(&self) -> bool {
        self.best.score.better_than(&self.base.score)
    }
}

impl std::fmt::Display for OrientationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (roll, pitch, yaw) = self.best.rotation.euler_angles();
        writeln!(f, "Orientation search ({} candidates):", self.evaluated)?;
        writeln!(
            f,
            "  Overhang faces: {} -> {}",
            self.base.score.overhang_count, self.best.score.overhang_count
        )?;
        writeln!(
            f,
            "  Min angle to down: {:.2}° -> {:.2}°",
            self.base.score.min_angle.to_degrees(),
            self.best.score.min_angle.to_degrees()
        )?;
        write!(
            f,
            "  Rotation (XYZ): {:.2}°, {:.2}°, {:.2}°",
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees()
        )
    }
}

/// `n` candidate rotations on a golden-angle spiral.
///
/// The first candidate of a single-candidate spiral is the identity.
pub fn golden_spiral_rotations(n: usize) -> Vec<UnitQuaternion<f64>> {
    let golden = golden_angle();
    (0..n)
        .map(|i| {
            let t = (i as f64 + 0.5) / n as f64;
            let tilt = FRAC_PI_2 - (1.0 - 2.0 * t).acos();
            let yaw = (i as f64 * golden) % TAU;
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), tilt)
                * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
        })
        .collect()
}

/// Search `iterations` rotations, applied on top of `base_rotation`, for the
/// one with the fewest overhanging faces.
///
/// `mesh` is in object space; `limit_angle` is in radians within `[0, π/2]`.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] for zero iterations or an out-of-range
/// limit.
pub fn optimize_orientation(
    mesh: &Mesh,
    base_rotation: &UnitQuaternion<f64>,
    limit_angle: f64,
    iterations: usize,
) -> CheckResult<OrientationResult> {
    require_in_range("limit_angle", limit_angle, 0.0, FRAC_PI_2)?;
    if iterations == 0 {
        return Err(CheckError::invalid_parameter(
            "iterations",
            0.0,
            "at least one candidate is required",
        ));
    }
    let _timer = OperationTimer::with_context("optimize_orientation", mesh);
    info!(
        iterations = iterations,
        limit_deg = limit_angle.to_degrees(),
        "Searching for orientation with least overhang"
    );

    let base = OrientationCandidate {
        rotation: *base_rotation,
        score: overhang_score(mesh, base_rotation, limit_angle),
    };

    let candidates: Vec<OrientationCandidate> = golden_spiral_rotations(iterations)
        .into_par_iter()
        .map(|spiral| {
            let rotation = spiral * base_rotation;
            OrientationCandidate {
                rotation,
                score: overhang_score(mesh, &rotation, limit_angle),
            }
        })
        .collect();

    let mut best = base;
    for (i, candidate) in candidates.iter().enumerate() {
        trace!(
            candidate = i,
            overhangs = candidate.score.overhang_count,
            min_angle = candidate.score.min_angle,
            "Scored orientation"
        );
        if candidate.score.better_than(&best.score) {
            best = *candidate;
        }
    }

    let result = OrientationResult {
        best,
        base,
        evaluated: candidates.len(),
    };
    debug!(
        base_overhangs = base.score.overhang_count,
        best_overhangs = best.score.overhang_count,
        improved = result.improved(),
        "Orientation search complete"
    );
    Ok(result)
}

/// Rotate a placed object so it prints with the least overhang.
///
/// The object's world transform is split into translation, rotation and
/// scale. The search runs on the scaled object-space mesh starting from the
/// current rotation; if a better rotation is found the world transform is
/// rewritten as translation · best rotation · scale.
pub fn orient_object<O>(
    object: &mut O,
    limit_angle: f64,
    iterations: usize,
    apply_modifiers: bool,
) -> CheckResult<OrientationResult>
where
    O: MeshObject + ?Sized,
{
    let world = object.world_transform();
    let parts = decompose_transform(&world)?;

    let geometry = object.extract(apply_modifiers);
    let scale = Matrix4::new_nonuniform_scaling(&parts.scale);
    let mesh = build_with_matrix(&geometry, Some(&scale), false)?;

    let result = optimize_orientation(&mesh, &parts.rotation, limit_angle, iterations)?;
    if result.improved() {
        let rotated = Matrix4::new_translation(&parts.translation)
            * result.best.rotation.to_homogeneous()
            * scale;
        object.set_world_transform(rotated);
        info!(
            overhangs = result.best.score.overhang_count,
            "Applied new orientation"
        );
    }
    Ok(result)
}

/// Translation, rotation and per-axis scale of an affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParts {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

/// Tolerance on `Rᵀ·R = I` for the extracted rotation.
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Split `world` into `T · R · S`. A mirroring transform keeps a negative X scale.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] if any axis has zero scale, or if the
/// transform is sheared so no rotation times per-axis scale reproduces it.
pub fn decompose_transform(world: &Matrix4<f64>) -> CheckResult<TransformParts> {
    let linear: Matrix3<f64> = world.fixed_view::<3, 3>(0, 0).into_owned();
    let translation: Vector3<f64> = world.fixed_view::<3, 1>(0, 3).into_owned();

    let mut scale = Vector3::new(
        linear.column(0).norm(),
        linear.column(1).norm(),
        linear.column(2).norm(),
    );
    if let Some(axis) = scale.iter().position(|s| *s <= f64::EPSILON) {
        return Err(CheckError::invalid_parameter(
            "scale",
            scale[axis],
            "object transform collapses an axis",
        ));
    }
    if linear.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    let mut rotation = linear;
    for (i, s) in scale.iter().enumerate() {
        rotation.set_column(i, &(linear.column(i) / *s));
    }
    let shear = (rotation.transpose() * rotation - Matrix3::identity()).amax();
    if shear > ORTHONORMAL_TOLERANCE {
        return Err(CheckError::invalid_parameter(
            "transform",
            shear,
            "object transform is sheared; apply the parent scale first",
        ));
    }
    let rotation =
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));

    Ok(TransformParts {
        translation,
        rotation,
        scale,
    })
}

/// Rotation that turns the average normal of `faces` to point straight down.
///
/// With `weight_by_area`, larger faces pull the average harder.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] for an empty selection, an index past
/// the face count, or normals that cancel out.
pub fn align_faces_down(
    mesh: &Mesh,
    faces: &[u32],
    weight_by_area: bool,
) -> CheckResult<UnitQuaternion<f64>> {
    if faces.is_empty() {
        return Err(CheckError::invalid_parameter(
            "faces",
            0.0,
            "no faces selected",
        ));
    }

    let mut sum = Vector3::zeros();
    for &idx in faces {
        let face = mesh.faces().get(idx as usize).ok_or_else(|| {
            CheckError::invalid_parameter("faces", f64::from(idx), "face index out of range")
        })?;
        if let Some(normal) = face.unit_normal() {
            sum += if weight_by_area {
                normal * face.area()
            } else {
                normal
            };
        }
    }

    let Some(average) = sum.try_normalize(f64::EPSILON) else {
        return Err(CheckError::invalid_parameter(
            "faces",
            faces.len() as f64,
            "selected face normals cancel out",
        ));
    };
    Ok(rotation_to_align(&average, &DOWN))
}

fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        // Opposite vectors: half turn about any perpendicular axis
        let axis = from
            .cross(&Vector3::x())
            .try_normalize(1e-6)
            .unwrap_or_else(|| from.cross(&Vector3::y()).normalize());
        UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), PI)
    })
}

impl Mesh {
    /// Run [`optimize_orientation`] from the identity rotation.
    pub fn optimize_orientation(
        &self,
        limit_angle: f64,
        iterations: usize,
    ) -> CheckResult<OrientationResult> {
        optimize_orientation(self, &UnitQuaternion::identity(), limit_angle, iterations)
    }
}
