//! Tracing helpers for the analyses.
//!
//! The library only emits events; installing a subscriber is up to the
//! application:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=mesh_printcheck=debug for per-check detail,
//! // RUST_LOG=mesh_printcheck::timing=info for timings only.
//! ```
//!
//! # Log Levels
//!
//! - **WARN**: a check flagged elements
//! - **INFO**: check start, clean results, timings
//! - **DEBUG**: intermediate counts (BVH size, candidate pairs)
//! - **TRACE**: per-candidate scores in the orientation search

use std::time::Instant;
use tracing::span::EnteredSpan;
use tracing::{Span, debug, info, warn};

use crate::finding::Finding;
use crate::types::Mesh;

/// A performance timer that logs duration on drop.
///
/// The timer enters a `check_operation` span for its lifetime, so events
/// logged on the same thread while it is alive carry the operation name and
/// mesh size.
///
/// ```rust,ignore
/// fn check_something(mesh: &Mesh) {
///     let _timer = OperationTimer::with_context("check_something", mesh);
///     // ... do work ...
/// } // logs elapsed_ms here
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: EnteredSpan,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("check_operation", operation = name).entered();
        debug!(target: "mesh_printcheck::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer carrying the mesh size as span fields.
    pub fn with_context(name: &'static str, mesh: &Mesh) -> Self {
        let span = tracing::info_span!(
            "check_operation",
            operation = name,
            faces = mesh.face_count(),
            edges = mesh.edge_count(),
            vertices = mesh.vertex_count()
        )
        .entered();
        debug!(
            target: "mesh_printcheck::timing",
            operation = name,
            faces = mesh.face_count(),
            edges = mesh.edge_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Get the span for this timer.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "mesh_printcheck::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log mesh statistics at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "mesh_printcheck::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        edges = mesh.edge_count(),
        faces = mesh.face_count(),
        triangles = mesh.triangle_count(),
        dimensions = format!("{:.4} x {:.4} x {:.4}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log the outcome of one check: `warn` if it flagged anything.
pub fn log_finding(finding: &Finding) {
    if finding.is_empty() {
        info!(label = finding.label(), "Check passed");
    } else {
        warn!(
            label = finding.label(),
            count = finding.len(),
            kind = ?finding.kind(),
            "Check flagged elements"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::ElementKind;
    use nalgebra::Point3;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_timer_span_is_current_while_alive() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let mesh = Mesh::from_triangles(
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ],
                &[[0, 1, 2]],
            )
            .unwrap();
            {
                let timer = OperationTimer::with_context("check_manifold", &mesh);
                assert_eq!(Span::current().id(), timer.span().id());
                assert_eq!(
                    Span::current().metadata().map(|m| m.name()),
                    Some("check_operation")
                );
            }
            assert!(Span::current().is_none());
        });
    }

    #[test]
    fn test_logging_helpers() {
        let mesh = Mesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();
        // Just verify these don't panic without a subscriber
        let _timer = OperationTimer::with_context("test_operation", &mesh);
        log_mesh_stats(&mesh, "test");
        log_finding(&Finding::new("Thin Faces", ElementKind::Face, vec![0], 1));
        log_finding(&Finding::new("Thin Faces", ElementKind::Face, vec![], 1));
    }
}
