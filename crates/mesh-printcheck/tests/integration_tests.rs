//! Integration tests for the print checks.
//!
//! Each test builds a small mesh through the public adapter and checks the
//! findings end to end.
//!
//! Run with: cargo test -p mesh-printcheck --test integration_tests

use mesh_printcheck::{
    BuildOptions, CheckConfig, CheckError, CheckKind, ElementKind, Mesh, PrintObject, SourceMesh,
    TransformMode, build, check_all, check_degenerate, check_manifold, check_nonplanar,
    check_overhang, check_self_intersect, check_sharp, check_source, check_thickness,
    optimize_orientation, orient_object,
};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};

// =============================================================================
// Test Mesh Creation Helpers
// =============================================================================

fn tetra_source() -> SourceMesh {
    SourceMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ],
        vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
    )
}

/// Axis-aligned box with quad faces, wound outward.
fn box_source(min: [f64; 3], max: [f64; 3]) -> SourceMesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    SourceMesh::new(
        vec![
            Point3::new(x0, y0, z0),
            Point3::new(x1, y0, z0),
            Point3::new(x1, y1, z0),
            Point3::new(x0, y1, z0),
            Point3::new(x0, y0, z1),
            Point3::new(x1, y0, z1),
            Point3::new(x1, y1, z1),
            Point3::new(x0, y1, z1),
        ],
        vec![
            vec![0, 3, 2, 1], // bottom
            vec![4, 5, 6, 7], // top
            vec![0, 1, 5, 4], // front
            vec![2, 3, 7, 6], // back
            vec![0, 4, 7, 3], // left
            vec![1, 2, 6, 5], // right
        ],
    )
}

fn merge(a: &SourceMesh, b: &SourceMesh) -> SourceMesh {
    let offset = a.positions.len() as u32;
    let mut positions = a.positions.clone();
    positions.extend_from_slice(&b.positions);
    let mut faces = a.faces.clone();
    faces.extend(
        b.faces
            .iter()
            .map(|f| f.iter().map(|v| v + offset).collect::<Vec<_>>()),
    );
    SourceMesh::new(positions, faces)
}

fn mesh_of(source: &SourceMesh) -> Mesh {
    build(source, &BuildOptions::default()).unwrap()
}

// =============================================================================
// Topology
// =============================================================================

#[test]
fn test_tetrahedron_is_clean() {
    let mesh = mesh_of(&tetra_source());
    let (non_manifold, non_contiguous) = check_manifold(&mesh);

    assert!(non_manifold.is_empty());
    assert!(non_contiguous.is_empty());
    assert!(mesh.is_solid());

    let (faces, edges) = check_degenerate(&mesh, 1e-4, 1e-4).unwrap();
    assert!(faces.is_empty());
    assert!(edges.is_empty());
}

#[test]
fn test_manifold_findings_partition_edges() {
    // Tetra with one face missing: three boundary edges, three shared edges
    let mut source = tetra_source();
    source.faces.pop();
    let mesh = mesh_of(&source);
    let (non_manifold, non_contiguous) = check_manifold(&mesh);

    assert_eq!(non_manifold.len(), 3);
    assert!(non_contiguous.is_empty());
    for &e in non_manifold.indices() {
        assert!(!non_contiguous.contains(e));
        assert_ne!(mesh.edges()[e as usize].face_count(), 2);
    }
    let healthy = (0..mesh.edge_count() as u32)
        .filter(|&e| !non_manifold.contains(e) && !non_contiguous.contains(e))
        .count();
    assert_eq!(healthy, 3);
}

#[test]
fn test_duplicated_face_is_non_manifold() {
    let mut source = tetra_source();
    let dup = source.faces[0].clone();
    source.faces.push(dup);
    let mesh = mesh_of(&source);
    let (non_manifold, _) = check_manifold(&mesh);

    // Every edge of the duplicated face now has three faces
    assert_eq!(non_manifold.len(), 3);
    for &e in non_manifold.indices() {
        assert_eq!(mesh.edges()[e as usize].face_count(), 3);
    }
}

#[test]
fn test_flipped_face_is_non_contiguous() {
    let mut source = tetra_source();
    source.faces[0].reverse();
    let mesh = mesh_of(&source);
    let (non_manifold, non_contiguous) = check_manifold(&mesh);

    assert!(non_manifold.is_empty());
    assert_eq!(non_contiguous.len(), 3);
    assert!(!mesh.is_solid());
}

// =============================================================================
// Metrics
// =============================================================================

#[test]
fn test_flat_quad_split_into_triangles_is_planar() {
    let quad = SourceMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![vec![0, 1, 2, 3]],
    );
    let split = build(&quad, &BuildOptions::default().with_triangulate(true)).unwrap();
    assert_eq!(split.face_count(), 2);
    assert!(check_nonplanar(&split, 0.0).unwrap().is_empty());

    let whole = mesh_of(&quad);
    assert!(check_nonplanar(&whole, 0.0).unwrap().is_empty());
}

#[test]
fn test_warped_quad_is_nonplanar() {
    let quad = SourceMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.3),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![vec![0, 1, 2, 3]],
    );
    let mesh = mesh_of(&quad);
    let finding = check_nonplanar(&mesh, 5f64.to_radians()).unwrap();
    assert_eq!(finding.indices(), &[0]);

    // The same warp is acceptable under a loose limit
    assert!(check_nonplanar(&mesh, 45f64.to_radians()).unwrap().is_empty());
}

#[test]
fn test_box_edges_are_sharp_at_right_angle_limit() {
    let mesh = mesh_of(&box_source([0.0; 3], [1.0; 3]));

    // Every box edge bends by 90 degrees
    let sharp = check_sharp(&mesh, 80f64.to_radians()).unwrap();
    assert_eq!(sharp.len(), 12);
    assert_eq!(sharp.kind(), Some(ElementKind::Edge));

    assert!(check_sharp(&mesh, 100f64.to_radians()).unwrap().is_empty());
}

#[test]
fn test_sliver_face_is_degenerate() {
    let source = SourceMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 1e-9),
        ],
        vec![vec![0, 1, 2]],
    );
    let mesh = mesh_of(&source);
    let (faces, edges) = check_degenerate(&mesh, 1e-6, 1e-6).unwrap();
    assert_eq!(faces.indices(), &[0]);
    assert!(edges.is_empty());
}

// =============================================================================
// Self-Intersection
// =============================================================================

#[test]
fn test_overlapping_boxes_intersect() {
    let a = box_source([0.0; 3], [1.0; 3]);
    let b = box_source([0.5; 3], [1.5; 3]);
    let mesh = mesh_of(&merge(&a, &b));

    let finding = check_self_intersect(&mesh);
    assert!(!finding.is_empty());
    // The top, back and right faces of the first box pierce the second
    for face in [1, 3, 5] {
        assert!(finding.contains(face));
    }
    // And the bottom, front and left of the second pierce the first
    for face in [6, 8, 10] {
        assert!(finding.contains(face));
    }
}

#[test]
fn test_separated_boxes_do_not_intersect() {
    let a = box_source([0.0; 3], [1.0; 3]);
    let b = box_source([2.0; 3], [3.0; 3]);
    let mesh = mesh_of(&merge(&a, &b));
    assert!(check_self_intersect(&mesh).is_empty());
}

#[test]
fn test_clean_box_has_no_self_intersections() {
    let mesh = mesh_of(&box_source([0.0; 3], [2.0, 1.0, 0.5]));
    assert!(check_self_intersect(&mesh).is_empty());

    let tris = build(
        &box_source([0.0; 3], [2.0, 1.0, 0.5]),
        &BuildOptions::default().with_triangulate(true),
    )
    .unwrap();
    assert!(check_self_intersect(&tris).is_empty());
}

// =============================================================================
// Thickness
// =============================================================================

#[test]
fn test_thin_plate_is_flagged() {
    let mesh = mesh_of(&box_source([0.0; 3], [10.0, 10.0, 0.5]));
    let finding = check_thickness(&mesh, 1.0).unwrap();
    // Bottom and top face each other across the plate
    assert_eq!(finding.indices(), &[0, 1]);

    assert!(check_thickness(&mesh, 0.4).unwrap().is_empty());
}

#[test]
fn test_thickness_zero_and_negative() {
    let mesh = mesh_of(&box_source([0.0; 3], [1.0; 3]));
    assert!(check_thickness(&mesh, 0.0).unwrap().is_empty());
    assert!(matches!(
        check_thickness(&mesh, -1.0),
        Err(CheckError::InvalidParameter { .. })
    ));
}

// =============================================================================
// Overhang and Orientation
// =============================================================================

#[test]
fn test_box_bottom_overhangs() {
    let mesh = mesh_of(&box_source([0.0; 3], [1.0; 3]));
    let finding = check_overhang(&mesh, 45f64.to_radians()).unwrap();
    assert_eq!(finding.indices(), &[0]);

    let skipped = check_overhang(&mesh, FRAC_PI_2).unwrap();
    assert!(skipped.is_scalar());
    assert!(skipped.is_empty());
}

#[test]
fn test_single_iteration_matches_direct_check() {
    let mesh = mesh_of(&tetra_source());
    let limit = 45f64.to_radians();

    let result = optimize_orientation(&mesh, &UnitQuaternion::identity(), limit, 1).unwrap();
    let direct = check_overhang(&mesh, limit).unwrap();

    assert_eq!(result.evaluated, 1);
    assert_eq!(result.base.score.overhang_count, direct.len());
}

#[test]
fn test_optimizer_never_worse_than_base() {
    let mesh = mesh_of(&box_source([0.0; 3], [3.0, 1.0, 0.5]));
    let limit = 30f64.to_radians();

    for iterations in [1, 2, 7, 48] {
        for angle in [0.0, 0.4, 1.3, PI] {
            let base = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle);
            let result = optimize_orientation(&mesh, &base, limit, iterations).unwrap();
            assert!(!result.base.score.better_than(&result.best.score));
        }
    }
}

#[test]
fn test_orient_object_keeps_position() {
    let source = box_source([-0.5; 3], [0.5; 3]);
    let transform = Matrix4::new_translation(&Vector3::new(10.0, -4.0, 2.0))
        * Matrix4::from_axis_angle(&Vector3::x_axis(), 0.7);
    let mut object = PrintObject::new("cube", source).with_transform(transform);

    let result = orient_object(&mut object, 45f64.to_radians(), 48, true).unwrap();
    assert!(!result.base.score.better_than(&result.best.score));

    let t = object.transform;
    assert!((t[(0, 3)] - 10.0).abs() < 1e-9);
    assert!((t[(1, 3)] + 4.0).abs() < 1e-9);
    assert!((t[(2, 3)] - 2.0).abs() < 1e-9);
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_check_all_is_idempotent() {
    let mesh = mesh_of(&merge(
        &box_source([0.0; 3], [1.0; 3]),
        &box_source([0.5; 3], [1.5; 3]),
    ));
    let config = CheckConfig::default();

    let first = check_all(&mesh, &config).unwrap();
    let second = check_all(&mesh, &config).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_clean());
}

#[test]
fn test_check_source_applies_world_transform_per_check() {
    // Flipped upside down: the object's local bottom becomes its top
    let object = PrintObject::new("box", box_source([0.0; 3], [1.0; 3]))
        .with_transform(Matrix4::from_axis_angle(&Vector3::x_axis(), PI));
    let config = CheckConfig::default();

    let report = check_source(&object, &config, &[CheckKind::Overhang]).unwrap();
    let overhang = report.get("Overhang Face").unwrap();
    // In world space the local top (face 1) now points down
    assert_eq!(overhang.indices(), &[1]);

    let forced = CheckConfig {
        transform_mode: Some(TransformMode::None),
        ..CheckConfig::default()
    };
    let report = check_source(&object, &forced, &[CheckKind::Overhang]).unwrap();
    assert_eq!(report.get("Overhang Face").unwrap().indices(), &[0]);
}

#[test]
fn test_stale_finding_is_rejected() {
    let mesh = mesh_of(&box_source([0.0; 3], [1.0; 3]));
    let finding = check_overhang(&mesh, 45f64.to_radians()).unwrap();
    assert_eq!(finding.resolve(mesh.element_counts()).unwrap(), &[0]);

    // The host geometry changes after the analysis ran
    let edited = mesh_of(&tetra_source());
    assert!(matches!(
        finding.resolve(edited.element_counts()),
        Err(CheckError::StaleFinding { .. })
    ));
}
