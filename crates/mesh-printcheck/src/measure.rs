//! Measurements: volume, surface area, bounds, build-volume fit, scaling
//! helpers and coarse clearance between bodies.
//!
//! # Example
//!
//! ```
//! use mesh_printcheck::Mesh;
//! use mesh_printcheck::measure::{bounds_lengths, surface_area, volume};
//! use nalgebra::Point3;
//!
//! let mesh = Mesh::from_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!         Point3::new(0.0, 0.0, 1.0),
//!     ],
//!     &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
//! )
//! .unwrap();
//!
//! assert!((volume(&mesh) - 1.0 / 6.0).abs() < 1e-12);
//! assert!(surface_area(&mesh) > 0.0);
//! assert_eq!(bounds_lengths(&mesh).x, 1.0);
//! ```

use nalgebra::Vector3;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, warn};

use crate::bvh::Aabb;
use crate::error::{CheckError, CheckResult, require_non_negative};
use crate::types::Mesh;

// ============================================================================
// Statistics
// ============================================================================

/// Signed enclosed volume by the divergence theorem.
///
/// Positive for outward-facing closed meshes. Meaningless for open meshes.
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangle_iter()
        .map(|t| t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords)) / 6.0)
        .sum()
}

/// Absolute enclosed volume.
pub fn volume(mesh: &Mesh) -> f64 {
    signed_volume(mesh).abs()
}

/// Sum of face areas.
pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.faces().par_iter().map(|f| f.area()).sum()
}

/// Axis-aligned bounds of all vertices.
pub fn bounds(mesh: &Mesh) -> Aabb {
    let (min, max) = mesh.bounds();
    Aabb::new(min, max)
}

/// Size of the bounds along X, Y and Z.
pub fn bounds_lengths(mesh: &Mesh) -> Vector3<f64> {
    bounds(mesh).extent()
}

/// Volume, area and size of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshStats {
    pub volume: f64,
    pub area: f64,
    pub lengths: [f64; 3],
}

impl MeshStats {
    pub fn of(mesh: &Mesh) -> Self {
        let lengths = bounds_lengths(mesh);
        Self {
            volume: volume(mesh),
            area: surface_area(mesh),
            lengths: [lengths.x, lengths.y, lengths.z],
        }
    }
}

// ============================================================================
// Build volume
// ============================================================================

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Result of [`check_bed_fit`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BedFitResult {
    /// Whether the object fits, after scaling if a scale was applied.
    pub fits: bool,
    /// Axes on which the unscaled object exceeds the bed.
    pub overflow_axes: Vec<Axis>,
    /// Uniform scale applied with `auto_scale`; only set when the object
    /// overflowed.
    pub scale_applied: Option<f64>,
    /// Object size after scaling.
    pub lengths: [f64; 3],
}

/// Relative slack when comparing scaled lengths against the bed.
const BED_FIT_TOLERANCE: f64 = 1e-9;

/// Compare an object's size against the printer's build volume.
///
/// With `auto_scale`, an object that overflows any axis is scaled uniformly
/// by the smallest `bed / length` ratio over axes with positive length, so
/// it exactly fills the tightest axis. An object that already fits is left
/// at its size.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] if any bed dimension is not positive.
pub fn check_bed_fit(
    lengths: &Vector3<f64>,
    bed: &Vector3<f64>,
    auto_scale: bool,
) -> CheckResult<BedFitResult> {
    for axis in Axis::ALL {
        let size = bed[axis.index()];
        if size.is_nan() || size <= 0.0 {
            return Err(CheckError::invalid_parameter(
                "bed",
                size,
                format!("build volume {} must be positive", axis),
            ));
        }
    }

    let overflow_axes: Vec<Axis> = Axis::ALL
        .into_iter()
        .filter(|a| lengths[a.index()] > bed[a.index()])
        .collect();

    let scale_applied = if auto_scale && !overflow_axes.is_empty() {
        let scale = Axis::ALL
            .into_iter()
            .filter(|a| lengths[a.index()] > 0.0)
            .map(|a| bed[a.index()] / lengths[a.index()])
            .fold(f64::INFINITY, f64::min);
        scale.is_finite().then_some(scale)
    } else {
        None
    };

    let scaled = lengths * scale_applied.unwrap_or(1.0);
    // Relative slack so an exact fill survives the scale round-off.
    let fits = Axis::ALL
        .into_iter()
        .all(|a| scaled[a.index()] <= bed[a.index()] * (1.0 + BED_FIT_TOLERANCE));

    if !fits {
        let axes: Vec<String> = overflow_axes.iter().map(Axis::to_string).collect();
        warn!(axes = axes.join(","), "Object exceeds build volume");
    }
    debug!(fits = fits, scale = ?scale_applied, "Bed fit checked");

    Ok(BedFitResult {
        fits,
        overflow_axes,
        scale_applied,
        lengths: [scaled.x, scaled.y, scaled.z],
    })
}

// ============================================================================
// Scale helpers
// ============================================================================

/// Uniform scale that turns `current` volume into `target`.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] for a zero current volume or a negative
/// target.
pub fn scale_to_volume(current: f64, target: f64) -> CheckResult<f64> {
    require_non_negative("target_volume", target)?;
    if current.is_nan() || current == 0.0 {
        return Err(CheckError::invalid_parameter(
            "current_volume",
            current,
            "cannot scale an object without volume",
        ));
    }
    Ok(target.cbrt() / current.abs().cbrt())
}

/// Uniform scale that turns the longest side `current` into `target`.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] for a zero current length or a negative
/// target.
pub fn scale_to_bounds(current: f64, target: f64) -> CheckResult<f64> {
    require_non_negative("target_length", target)?;
    if current.is_nan() || current <= 0.0 {
        return Err(CheckError::invalid_parameter(
            "current_length",
            current,
            "cannot scale an object without extent",
        ));
    }
    Ok(target / current)
}

// ============================================================================
// Clearance
// ============================================================================

/// A named body's world-space bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyBounds {
    pub name: String,
    pub aabb: Aabb,
}

impl BodyBounds {
    pub fn new(name: impl Into<String>, aabb: Aabb) -> Self {
        Self {
            name: name.into(),
            aabb,
        }
    }

    /// Bounds of an already-transformed mesh.
    pub fn from_mesh(name: impl Into<String>, mesh: &Mesh) -> Self {
        Self::new(name, bounds(mesh))
    }
}

/// Two bodies closer than the required gap.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClearanceIssue {
    pub first: String,
    pub second: String,
    /// Gap between the bounding boxes, zero when they touch or overlap.
    pub gap: f64,
}

/// Report every pair of bodies whose bounding boxes are closer than `min_gap`.
///
/// The gap is measured between axis-aligned bounding boxes, not surfaces,
/// so concave or diagonal bodies can report a gap smaller than the real one.
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] if `min_gap` is negative or NaN.
pub fn check_clearance(bodies: &[BodyBounds], min_gap: f64) -> CheckResult<Vec<ClearanceIssue>> {
    require_non_negative("min_gap", min_gap)?;

    let mut issues = Vec::new();
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let gap = a.aabb.distance(&b.aabb);
            if gap < min_gap {
                issues.push(ClearanceIssue {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    gap,
                });
            }
        }
    }
    if !issues.is_empty() {
        warn!(
            pairs = issues.len(),
            min_gap = min_gap,
            "Bodies closer than required clearance"
        );
    }
    Ok(issues)
}
