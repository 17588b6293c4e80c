//! Property-based tests for the print checks.
//!
//! These tests use proptest to generate random meshes and rotations and
//! verify the invariants every check promises.
//!
//! Run with: cargo test -p mesh-printcheck -- proptest

use mesh_printcheck::{
    Finding, Mesh, check_degenerate, check_manifold, check_overhang, check_self_intersect,
    check_thickness, optimize_orientation,
};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use proptest::prelude::*;

// =============================================================================
// Strategies for generating random meshes
// =============================================================================

/// Generate a random vertex position in a bounded range.
fn arb_position() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-10.0..10.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Generate a triangle soup with valid, non-repeating corner indices.
fn arb_soup(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = Mesh> {
    (4..=max_vertices).prop_flat_map(move |num_vertices| {
        let positions = prop::collection::vec(arb_position(), num_vertices);
        let n = num_vertices as u32;
        let face = prop::array::uniform3(0..n)
            .prop_filter("corners must differ", |[a, b, c]| a != b && b != c && a != c);
        let faces = prop::collection::vec(face, 1..=max_faces);
        (positions, faces).prop_map(|(positions, faces)| {
            Mesh::from_triangles(positions, &faces).expect("generated soup is valid")
        })
    })
}

/// Generate an arbitrary rotation from an axis and an angle.
fn arb_rotation() -> impl Strategy<Value = UnitQuaternion<f64>> {
    (
        prop::array::uniform3(-1.0..1.0f64),
        -std::f64::consts::PI..std::f64::consts::PI,
    )
        .prop_filter_map("axis must not vanish", |([x, y, z], angle)| {
            let axis = Vector3::new(x, y, z);
            (axis.norm() > 1e-3)
                .then(|| UnitQuaternion::from_scaled_axis(axis.normalize() * angle))
        })
}

/// Axis-aligned box with the given side lengths, wound outward.
fn box_mesh(size: [f64; 3]) -> Mesh {
    let [x, y, z] = size;
    Mesh::from_polygons(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(x, 0.0, 0.0),
            Point3::new(x, y, 0.0),
            Point3::new(0.0, y, 0.0),
            Point3::new(0.0, 0.0, z),
            Point3::new(x, 0.0, z),
            Point3::new(x, y, z),
            Point3::new(0.0, y, z),
        ],
        &[
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ],
    )
    .expect("box is valid")
}

fn rotated(mesh: &Mesh, rotation: &UnitQuaternion<f64>) -> Mesh {
    let positions = mesh
        .vertices()
        .iter()
        .map(|v| rotation.transform_point(&v.position))
        .collect();
    let loops: Vec<&[u32]> = mesh.faces().iter().map(|f| f.vertices()).collect();
    Mesh::from_polygons(positions, &loops).expect("rotation keeps the mesh valid")
}

fn is_strictly_sorted(finding: &Finding) -> bool {
    finding.indices().windows(2).all(|w| w[0] < w[1])
}

fn is_subset(small: &Finding, large: &Finding) -> bool {
    small.indices().iter().all(|&i| large.contains(i))
}

// =============================================================================
// Property Tests: Finding Shape
// =============================================================================

proptest! {
    /// Every finding is sorted, free of duplicates and in range.
    #[test]
    fn proptest_findings_are_sorted_and_in_range(mesh in arb_soup(20, 30)) {
        let (non_manifold, non_contiguous) = check_manifold(&mesh);
        let (zero_faces, zero_edges) = check_degenerate(&mesh, 1e-4, 1e-4).unwrap();
        let intersect = check_self_intersect(&mesh);

        for finding in [&non_manifold, &non_contiguous, &zero_faces, &zero_edges, &intersect] {
            prop_assert!(is_strictly_sorted(finding));
            prop_assert!(finding.resolve(mesh.element_counts()).is_ok());
        }
    }

    /// Every edge is exactly one of: non-manifold, non-contiguous, healthy.
    #[test]
    fn proptest_manifold_partition(mesh in arb_soup(20, 30)) {
        let (non_manifold, non_contiguous) = check_manifold(&mesh);

        for (idx, edge) in mesh.edges().iter().enumerate() {
            let idx = idx as u32;
            prop_assert!(!(non_manifold.contains(idx) && non_contiguous.contains(idx)));
            prop_assert_eq!(non_manifold.contains(idx), edge.face_count() != 2);
            prop_assert_eq!(
                non_contiguous.contains(idx),
                edge.is_manifold() && !edge.is_contiguous()
            );
        }
    }

    /// Running a check twice yields the same finding.
    #[test]
    fn proptest_checks_are_deterministic(mesh in arb_soup(16, 24)) {
        prop_assert_eq!(check_self_intersect(&mesh), check_self_intersect(&mesh));
        prop_assert_eq!(check_thickness(&mesh, 0.5).unwrap(), check_thickness(&mesh, 0.5).unwrap());
    }
}

// =============================================================================
// Property Tests: Threshold Monotonicity
// =============================================================================

proptest! {
    /// Raising the overhang limit can only clear faces, never add them.
    #[test]
    fn proptest_overhang_monotonic(
        mesh in arb_soup(12, 20),
        a in 0.0..1.5f64,
        b in 0.0..1.5f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let strict = check_overhang(&mesh, low).unwrap();
        let loose = check_overhang(&mesh, high).unwrap();
        prop_assert!(is_subset(&loose, &strict));
    }

    /// Raising the minimum thickness can only add faces.
    #[test]
    fn proptest_thickness_monotonic(
        size in prop::array::uniform3(0.2..5.0f64),
        a in 0.01..6.0f64,
        b in 0.01..6.0f64,
    ) {
        let mesh = box_mesh(size);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let thin = check_thickness(&mesh, low).unwrap();
        let thick = check_thickness(&mesh, high).unwrap();
        prop_assert!(is_subset(&thin, &thick));
    }
}

// =============================================================================
// Property Tests: Orientation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The search result is never worse than the starting rotation.
    #[test]
    fn proptest_orientation_never_worse(
        size in prop::array::uniform3(0.5..4.0f64),
        base in arb_rotation(),
        iterations in 1usize..40,
    ) {
        let mesh = box_mesh(size);
        let limit = 45f64.to_radians();
        let result = optimize_orientation(&mesh, &base, limit, iterations).unwrap();

        prop_assert!(!result.base.score.better_than(&result.best.score));
        prop_assert_eq!(result.evaluated, iterations);
    }

    /// A rotated box stays a clean solid without self-intersections.
    #[test]
    fn proptest_rotated_box_stays_clean(
        size in prop::array::uniform3(0.5..4.0f64),
        rotation in arb_rotation(),
    ) {
        let mesh = rotated(&box_mesh(size), &rotation);
        prop_assert!(mesh.is_solid());
        prop_assert!(check_self_intersect(&mesh).is_empty());
    }
}
