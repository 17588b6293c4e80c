//! Wall thickness check.
//!
//! # Algorithm
//!
//! For every triangle of every face, a ray starts just inside the surface
//! (the triangle centroid pulled back along the face normal by
//! [`EPS_BIAS`]) and travels inward, opposite the face normal, for at most
//! `min_thickness`. The first back-facing hit is the opposite wall; if it is
//! closer than `min_thickness`, both walls are flagged.
//!
//! Near sharp internal corners the ray can leave through a neighbouring
//! wall and under-measure the true thickness. This is a known limit of the
//! method and is not corrected for.

use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::bvh::Bvh;
use crate::error::{CheckError, CheckResult};
use crate::finding::{ElementKind, Finding};
use crate::tracing_ext::{OperationTimer, log_finding};
use crate::types::Mesh;

pub const LABEL_THIN: &str = "Thin Faces";

/// Inward offset of each ray origin.
pub const EPS_BIAS: f64 = 1e-4;

/// A measured wall: the casting face, the face hit, and the distance between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinWall {
    pub face: u32,
    pub hit_face: u32,
    pub thickness: f64,
}

/// Flag faces whose wall is thinner than `min_thickness`.
///
/// A `min_thickness` of zero returns an empty finding without casting any
/// rays. Rays that leave the mesh without a back-facing hit are not
/// flagged.
pub fn check_thickness(mesh: &Mesh, min_thickness: f64) -> CheckResult<Finding> {
    validate_min_thickness(min_thickness)?;
    if min_thickness == 0.0 {
        return Ok(empty_finding(mesh));
    }
    let bvh = Bvh::build(mesh);
    check_thickness_with(mesh, &bvh, min_thickness)
}

/// [`check_thickness`] with a prebuilt BVH of `mesh`.
pub fn check_thickness_with(mesh: &Mesh, bvh: &Bvh, min_thickness: f64) -> CheckResult<Finding> {
    let walls = thin_walls(mesh, bvh, min_thickness)?;

    let mut faces = Vec::with_capacity(walls.len() * 2);
    for wall in &walls {
        faces.push(wall.face);
        faces.push(wall.hit_face);
    }
    let finding = Finding::new(LABEL_THIN, ElementKind::Face, faces, mesh.face_count());
    log_finding(&finding);
    Ok(finding)
}

/// Every wall measured thinner than `min_thickness`, in face order.
pub fn thin_walls(mesh: &Mesh, bvh: &Bvh, min_thickness: f64) -> CheckResult<Vec<ThinWall>> {
    validate_min_thickness(min_thickness)?;
    let _timer = OperationTimer::with_context("check_thickness", mesh);
    if min_thickness == 0.0 {
        return Ok(Vec::new());
    }

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

    info!(
        faces = mesh.face_count(),
        min_thickness = min_thickness,
        "Starting wall thickness check"
    );

    let walls: Vec<ThinWall> = (0..mesh.face_count())
        .into_par_iter()
        .flat_map_iter(|face_idx| measure_face(mesh, bvh, face_idx, min_thickness))
        .collect();

    if !walls.is_empty() {
        let thinnest = walls
            .iter()
            .map(|w| w.thickness)
            .fold(f64::INFINITY, f64::min);
        debug!(
            walls = walls.len(),
            thinnest = format!("{:.6}", thinnest),
            "Thin walls measured"
        );
    }
    Ok(walls)
}

fn measure_face(mesh: &Mesh, bvh: &Bvh, face_idx: usize, min_thickness: f64) -> Vec<ThinWall> {
    let face = &mesh.faces()[face_idx];
    let Some(normal) = face.unit_normal() else {
        return Vec::new();
    };
    let direction: Vector3<f64> = -normal;
    let face_id = face_idx as u32;

    let accept = |tri: usize| {
        if mesh.triangle_face(tri) == face_id {
            return false;
        }
        // Pass through walls seen from outside
        bvh.triangle(tri)
            .normal()
            .is_some_and(|n| n.dot(&direction) > 0.0)
    };

    let mut walls = Vec::new();
    for tri_idx in face.triangle_range() {
        let origin = mesh.triangle(tri_idx).centroid() - normal * EPS_BIAS;
        if let Some(hit) = bvh.cast_ray(&origin, &direction, min_thickness, accept) {
            let thickness = hit.distance + EPS_BIAS;
            if thickness < min_thickness {
                walls.push(ThinWall {
                    face: face_id,
                    hit_face: mesh.triangle_face(hit.triangle),
                    thickness,
                });
            }
        }
    }
    walls
}

fn validate_min_thickness(min_thickness: f64) -> CheckResult<()> {
    if min_thickness.is_nan() || min_thickness < 0.0 {
        return Err(CheckError::invalid_parameter(
            "min_thickness",
            min_thickness,
            "must be zero or positive",
        ));
    }
    Ok(())
}

fn empty_finding(mesh: &Mesh) -> Finding {
    Finding::new(LABEL_THIN, ElementKind::Face, Vec::new(), mesh.face_count())
}

impl Mesh {
    /// Run [`check_thickness`] on this mesh.
    pub fn check_thickness(&self, min_thickness: f64) -> CheckResult<Finding> {
        check_thickness(self, min_thickness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use nalgebra::Point3;

    /// Axis-aligned box of quads, faces ordered -Z, +Z, -Y, +Y, -X, +X.
    fn make_box(sx: f64, sy: f64, sz: f64) -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(sx, 0.0, 0.0),
            Point3::new(sx, sy, 0.0),
            Point3::new(0.0, sy, 0.0),
            Point3::new(0.0, 0.0, sz),
            Point3::new(sx, 0.0, sz),
            Point3::new(sx, sy, sz),
            Point3::new(0.0, sy, sz),
        ];
        let faces = [
            [0u32, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [0, 4, 7, 3],
            [1, 2, 6, 5],
        ];
        Mesh::from_polygons(positions, &faces).unwrap()
    }

    fn make_unit_cube() -> Mesh {
        make_box(1.0, 1.0, 1.0)
    }

    fn make_thin_box() -> Mesh {
        make_box(10.0, 10.0, 0.5)
    }

    #[test]
    fn test_solid_cube_is_thick_enough() {
        let finding = check_thickness(&make_unit_cube(), 0.5).unwrap();
        assert!(finding.is_empty());
        assert_eq!(finding.label(), LABEL_THIN);
    }

    #[test]
    fn test_thin_cube_flags_every_face() {
        let finding = make_unit_cube().check_thickness(2.0).unwrap();
        assert_eq!(finding.indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_thin_box_flags_both_plates() {
        let mesh = make_thin_box();
        let finding = check_thickness(&mesh, 1.0).unwrap();
        assert_eq!(finding.indices(), &[0, 1]);

        let walls = thin_walls(&mesh, &Bvh::build(&mesh), 1.0).unwrap();
        assert!(!walls.is_empty());
        for wall in walls {
            assert!((wall.thickness - 0.5).abs() < 1e-9);
            assert_ne!(wall.face, wall.hit_face);
        }
    }

    #[test]
    fn test_zero_thickness_short_circuits() {
        let finding = check_thickness(&make_thin_box(), 0.0).unwrap();
        assert!(finding.is_empty());
        assert_eq!(finding.element_count(), 6);
    }

    #[test]
    fn test_negative_thickness_rejected() {
        let err = check_thickness(&make_unit_cube(), -1.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert!(check_thickness(&make_unit_cube(), f64::NAN).is_err());
    }

    #[test]
    fn test_open_surface_is_not_thin() {
        let mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();
        assert!(check_thickness(&mesh, 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_inverted_box_is_not_measured() {
        // Flipped normals point inward: the inward rays leave the box.
        let mesh = make_unit_cube();
        let positions: Vec<_> = mesh.vertices().iter().map(|v| v.position).collect();
        let flipped: Vec<Vec<u32>> = mesh
            .faces()
            .iter()
            .map(|f| f.vertices().iter().rev().copied().collect())
            .collect();
        let inverted = Mesh::from_polygons(positions, &flipped).unwrap();
        assert!(check_thickness(&inverted, 2.0).unwrap().is_empty());
    }

    #[test]
    fn test_shared_bvh() {
        let mesh = make_thin_box();
        let bvh = Bvh::build(&mesh);
        assert_eq!(
            check_thickness_with(&mesh, &bvh, 1.0).unwrap(),
            check_thickness(&mesh, 1.0).unwrap()
        );
    }
}
