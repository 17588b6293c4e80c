//! 3D-printability analysis for polygon meshes.
//!
//! This crate inspects a mesh for the problems that make a print fail and
//! suggests a better print orientation. It only detects; it never edits
//! geometry.
//!
//! # Features
//!
//! - **Topology**: non-manifold edges and inconsistent winding
//! - **Metrics**: degenerate faces and edges, non-planar faces, sharp edges
//! - **Self-intersection**: BVH-accelerated exact triangle tests
//! - **Wall thickness**: inward ray casting against the same BVH
//! - **Overhang**: faces leaning past the printable angle, plus a
//!   deterministic orientation search that minimizes them
//! - **Measurement**: volume, area, bounds, build-volume fit, clearance
//!
//! # Mesh Model
//!
//! Analyses run on an immutable [`Mesh`] snapshot built from a host's
//! geometry with [`build`]. Vertices, edges and faces are addressed by
//! `u32` index. Faces are polygon loops wound counter-clockwise when seen
//! from outside; n-gons keep their identity and carry an internal
//! triangulation for the ray and intersection queries.
//!
//! Each check returns a [`Finding`]: a label, an element kind and the
//! sorted indices it flagged. A finding only applies to the mesh that
//! produced it; [`Finding::resolve`] refuses stale indices.
//!
//! # Quick Start
//!
//! ```
//! use mesh_printcheck::{BuildOptions, CheckConfig, SourceMesh, build, check_all};
//! use nalgebra::Point3;
//!
//! let source = SourceMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!         Point3::new(0.0, 0.0, 1.0),
//!     ],
//!     vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
//! );
//! let mesh = build(&source, &BuildOptions::default()).unwrap();
//!
//! let report = check_all(&mesh, &CheckConfig::default()).unwrap();
//! for entry in report.entries() {
//!     println!("{}", entry.finding);
//! }
//! assert!(mesh.is_solid());
//! ```
//!
//! # Orientation
//!
//! ```
//! use mesh_printcheck::{Mesh, optimize_orientation};
//! use nalgebra::{Point3, UnitQuaternion};
//!
//! # let mesh = Mesh::from_triangles(
//! #     vec![
//! #         Point3::new(0.0, 0.0, 0.0),
//! #         Point3::new(1.0, 0.0, 0.0),
//! #         Point3::new(0.0, 1.0, 0.0),
//! #         Point3::new(0.0, 0.0, 1.0),
//! #     ],
//! #     &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
//! # )
//! # .unwrap();
//! let result =
//!     optimize_orientation(&mesh, &UnitQuaternion::identity(), 45f64.to_radians(), 48).unwrap();
//! assert!(result.best.score.overhang_count <= result.base.score.overhang_count);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod triangulate;
mod types;

pub mod bvh;
pub mod finding;
pub mod intersect;
pub mod measure;
pub mod metrics;
pub mod orientation;
pub mod overhang;
pub mod report;
pub mod source;
pub mod thickness;
pub mod topology;
pub mod tracing_ext;
pub mod units;

// Core types
pub use error::{CheckError, CheckLocation, CheckResult, ErrorCode, RecoverySuggestion};
pub use finding::{ElementCounts, ElementKind, Finding};
pub use types::{Edge, EdgeUse, Face, Mesh, Triangle, Vertex};

// Mesh construction
pub use source::{
    BuildOptions, MeshObject, MeshSource, PrintObject, SourceMesh, TransformMode, build,
    build_with_matrix,
};

// Checks
pub use intersect::check_self_intersect;
pub use metrics::{check_degenerate, check_nonplanar, check_sharp};
pub use overhang::{OverhangOutcome, check_overhang};
pub use thickness::check_thickness;
pub use topology::{EdgeClass, check_manifold};

// Orientation
pub use orientation::{
    OrientationCandidate, OrientationResult, OrientationScore, align_faces_down,
    golden_spiral_rotations, optimize_orientation, orient_object,
};

// Aggregation
pub use report::{CheckConfig, CheckKind, Report, ReportEntry, check_all, check_source};

// Measurement and display
pub use measure::{BedFitResult, MeshStats, check_bed_fit, check_clearance};
pub use units::{LengthUnit, UnitSettings, UnitSystem};

pub use bvh::Bvh;
pub use tracing_ext::OperationTimer;
