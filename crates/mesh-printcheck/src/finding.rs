//! Analysis results.
//!
//! A [`Finding`] is a label, an element kind and a sorted set of element
//! indices. Indices are only meaningful for the mesh that produced the
//! finding; [`Finding::resolve`] checks them against the current element
//! counts before handing them out.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};

/// Kind of mesh element a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    Vertex,
    Edge,
    Face,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
            ElementKind::Face => write!(f, "face"),
        }
    }
}

/// Number of vertices, edges and faces of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementCounts {
    pub vertices: usize,
    pub edges: usize,
    pub faces: usize,
}

impl ElementCounts {
    /// Count for one element kind.
    pub fn of(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Vertex => self.vertices,
            ElementKind::Edge => self.edges,
            ElementKind::Face => self.faces,
        }
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Finding {
    label: String,
    kind: Option<ElementKind>,
    indices: Vec<u32>,
    element_count: usize,
}

impl Finding {
    /// Create a finding over elements of `kind`.
    ///
    /// `element_count` is the number of elements of that kind in the mesh
    /// that was analyzed. Indices are sorted and deduplicated.
    pub fn new(
        label: impl Into<String>,
        kind: ElementKind,
        mut indices: Vec<u32>,
        element_count: usize,
    ) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self {
            label: label.into(),
            kind: Some(kind),
            indices,
            element_count,
        }
    }

    /// Create a scalar report that selects no elements.
    pub fn scalar(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: None,
            indices: Vec::new(),
            element_count: 0,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Element kind, or `None` for a scalar report.
    #[inline]
    pub fn kind(&self) -> Option<ElementKind> {
        self.kind
    }

    /// Flagged element indices, ascending.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of flagged elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if nothing was flagged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True for a scalar report.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.kind.is_none()
    }

    /// Element count of the mesh that produced this finding.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// True if `index` was flagged.
    pub fn contains(&self, index: u32) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Return the indices if they still describe a mesh with `counts`.
    ///
    /// # Errors
    ///
    /// [`CheckError::StaleFinding`] if the element count has changed since
    /// the analysis ran or an index is out of range.
    pub fn resolve(&self, counts: ElementCounts) -> CheckResult<&[u32]> {
        let Some(kind) = self.kind else {
            return Ok(&[]);
        };
        let count = counts.of(kind);
        if count != self.element_count {
            return Err(CheckError::StaleFinding {
                kind,
                index: self.indices.first().map_or(0, |&i| i as usize),
                count,
            });
        }
        if let Some(&last) = self.indices.last()
            && last as usize >= count
        {
            return Err(CheckError::StaleFinding {
                kind,
                index: last as usize,
                count,
            });
        }
        Ok(&self.indices)
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_scalar() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}: {}", self.label, self.indices.len())
        }
    }
}
