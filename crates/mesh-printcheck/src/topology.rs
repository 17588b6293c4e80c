//! Manifold and winding checks over edges.
//!
//! Every edge falls into exactly one [`EdgeClass`]. A closed, consistently
//! wound solid has only [`EdgeClass::Contiguous`] edges.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::finding::{ElementKind, Finding};
use crate::tracing_ext::{OperationTimer, log_finding};
use crate::types::{Edge, Mesh};

/// Label for edges not shared by exactly two faces.
pub const LABEL_NON_MANIFOLD: &str = "Non-manifold Edges";
/// Label for manifold edges whose faces disagree on winding.
pub const LABEL_BAD_CONTIGUOUS: &str = "Bad Contiguous Edges";

/// Adjacency class of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeClass {
    /// Used by one face.
    Boundary,
    /// Two faces, opposite traversal directions.
    Contiguous,
    /// Two faces walking the edge the same way (flipped normal).
    NonContiguous,
    /// Three or more faces.
    NonManifold,
}

impl EdgeClass {
    pub fn of(edge: &Edge) -> Self {
        match edge.face_count() {
            0 | 1 => EdgeClass::Boundary,
            2 if edge.is_contiguous() => EdgeClass::Contiguous,
            2 => EdgeClass::NonContiguous,
            _ => EdgeClass::NonManifold,
        }
    }
}

/// Per-class edge counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeClassCounts {
    pub boundary: usize,
    pub contiguous: usize,
    pub non_contiguous: usize,
    pub non_manifold: usize,
}

impl EdgeClassCounts {
    pub fn total(&self) -> usize {
        self.boundary + self.contiguous + self.non_contiguous + self.non_manifold
    }
}

/// Classify every edge, in edge order.
pub fn classify_edges(mesh: &Mesh) -> Vec<EdgeClass> {
    mesh.edges().par_iter().map(EdgeClass::of).collect()
}

/// Count edges per class.
pub fn count_edge_classes(mesh: &Mesh) -> EdgeClassCounts {
    let mut counts = EdgeClassCounts::default();
    for class in classify_edges(mesh) {
        match class {
            EdgeClass::Boundary => counts.boundary += 1,
            EdgeClass::Contiguous => counts.contiguous += 1,
            EdgeClass::NonContiguous => counts.non_contiguous += 1,
            EdgeClass::NonManifold => counts.non_manifold += 1,
        }
    }
    counts
}

/// Find non-manifold edges and manifold edges with inconsistent winding.
///
/// Returns `(non_manifold, non_contiguous)`. The first finding holds every
/// edge whose face count is not two (boundary and fan edges alike); the
/// second holds two-face edges whose faces walk the edge the same way.
pub fn check_manifold(mesh: &Mesh) -> (Finding, Finding) {
    let _timer = OperationTimer::with_context("check_manifold", mesh);
    info!(edges = mesh.edge_count(), "Checking edge manifoldness");

    let classes = classify_edges(mesh);
    let mut non_manifold = Vec::new();
    let mut non_contiguous = Vec::new();
    for (idx, class) in classes.iter().enumerate() {
        match class {
            EdgeClass::Boundary | EdgeClass::NonManifold => non_manifold.push(idx as u32),
            EdgeClass::NonContiguous => non_contiguous.push(idx as u32),
            EdgeClass::Contiguous => {}
        }
    }
    debug!(
        non_manifold = non_manifold.len(),
        non_contiguous = non_contiguous.len(),
        "Edge classification complete"
    );

    let edge_count = mesh.edge_count();
    let non_manifold = Finding::new(
        LABEL_NON_MANIFOLD,
        ElementKind::Edge,
        non_manifold,
        edge_count,
    );
    let non_contiguous = Finding::new(
        LABEL_BAD_CONTIGUOUS,
        ElementKind::Edge,
        non_contiguous,
        edge_count,
    );
    log_finding(&non_manifold);
    log_finding(&non_contiguous);
    (non_manifold, non_contiguous)
}

impl Mesh {
    /// Run [`check_manifold`] on this mesh.
    pub fn check_manifold(&self) -> (Finding, Finding) {
        check_manifold(self)
    }

    /// True if every edge is shared by two consistently wound faces.
    pub fn is_solid(&self) -> bool {
        self.edges().iter().all(|e| e.is_contiguous())
    }
}
