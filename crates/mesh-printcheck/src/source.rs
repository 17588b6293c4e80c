//! Mesh adapter: host geometry in, analysis [`Mesh`] out.
//!
//! Hosts expose their geometry through [`MeshSource`]: raw positions and
//! per-face vertex loops, plus an optional world transform. [`build`] bakes
//! the requested part of that transform into the positions, optionally
//! splits n-gons into triangles, and constructs the immutable [`Mesh`].
//!
//! # Example
//!
//! ```
//! use mesh_printcheck::{build, BuildOptions, SourceMesh};
//! use nalgebra::Point3;
//!
//! let source = SourceMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![vec![0, 1, 2, 3]],
//! );
//!
//! let mesh = build(&source, &BuildOptions::default()).unwrap();
//! assert_eq!(mesh.face_count(), 1);
//!
//! let tris = build(&source, &BuildOptions::default().with_triangulate(true)).unwrap();
//! assert_eq!(tris.face_count(), 2);
//! ```

use nalgebra::{Matrix4, Point3, Vector3};
use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CheckResult;
use crate::finding::ElementCounts;
use crate::triangulate::triangulate_loop;
use crate::types::{Mesh, Vertex, newell_vector};

/// Host-side polygon geometry: positions and vertex loops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub positions: Vec<Point3<f64>>,
    pub faces: Vec<Vec<u32>>,
}

impl SourceMesh {
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<Vec<u32>>) -> Self {
        Self { positions, faces }
    }

    /// Build from flat `[x, y, z, ...]` coordinates and triangle indices.
    pub fn from_triangles(coords: &[f64], indices: &[u32]) -> Self {
        let positions = coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| c.to_vec()).collect();
        Self { positions, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Element counts as [`build`] would produce them without triangulation.
    ///
    /// Used to check findings against a host mesh that may have been edited.
    pub fn element_counts(&self) -> ElementCounts {
        let mut edges = hashbrown::HashSet::new();
        for face in &self.faces {
            let n = face.len();
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                edges.insert((a.min(b), a.max(b)));
            }
        }
        ElementCounts {
            vertices: self.positions.len(),
            edges: edges.len(),
            faces: self.faces.len(),
        }
    }
}

/// Anything that can hand its geometry to the analyses.
pub trait MeshSource {
    /// Geometry with deformations applied (`true`) or the base geometry.
    fn extract(&self, apply_modifiers: bool) -> Cow<'_, SourceMesh>;

    /// Object-to-world transform.
    fn world_transform(&self) -> Matrix4<f64> {
        Matrix4::identity()
    }
}

/// A source whose world transform can be rewritten.
pub trait MeshObject: MeshSource {
    fn set_world_transform(&mut self, transform: Matrix4<f64>);
}

impl MeshSource for SourceMesh {
    fn extract(&self, _apply_modifiers: bool) -> Cow<'_, SourceMesh> {
        Cow::Borrowed(self)
    }
}

/// A placed object: base geometry, optional deformed geometry, transform.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintObject {
    pub name: String,
    pub mesh: SourceMesh,
    pub deformed: Option<SourceMesh>,
    pub transform: Matrix4<f64>,
}

impl PrintObject {
    pub fn new(name: impl Into<String>, mesh: SourceMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            deformed: None,
            transform: Matrix4::identity(),
        }
    }

    /// Set the world transform.
    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    /// Attach the geometry returned when modifiers are applied.
    pub fn with_deformed(mut self, deformed: SourceMesh) -> Self {
        self.deformed = Some(deformed);
        self
    }
}

impl MeshSource for PrintObject {
    fn extract(&self, apply_modifiers: bool) -> Cow<'_, SourceMesh> {
        match (&self.deformed, apply_modifiers) {
            (Some(deformed), true) => Cow::Borrowed(deformed),
            _ => Cow::Borrowed(&self.mesh),
        }
    }

    fn world_transform(&self) -> Matrix4<f64> {
        self.transform
    }
}

impl MeshObject for PrintObject {
    fn set_world_transform(&mut self, transform: Matrix4<f64>) {
        self.transform = transform;
    }
}

/// How much of the world transform to bake into vertex positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TransformMode {
    /// Object-local coordinates.
    #[default]
    None,
    /// Rotation and scale only; translation is dropped.
    Linear,
    /// Full affine transform.
    Full,
}

impl TransformMode {
    /// Matrix to apply for this mode given the object's world transform.
    pub fn matrix(&self, world: &Matrix4<f64>) -> Option<Matrix4<f64>> {
        match self {
            TransformMode::None => None,
            TransformMode::Full => Some(*world),
            TransformMode::Linear => {
                let mut linear = *world;
                linear[(0, 3)] = 0.0;
                linear[(1, 3)] = 0.0;
                linear[(2, 3)] = 0.0;
                Some(linear)
            }
        }
    }
}

/// Options for [`build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub transform: TransformMode,
    pub apply_modifiers: bool,
    pub triangulate: bool,
}

impl BuildOptions {
    pub fn with_transform(mut self, transform: TransformMode) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_apply_modifiers(mut self, apply_modifiers: bool) -> Self {
        self.apply_modifiers = apply_modifiers;
        self
    }

    pub fn with_triangulate(mut self, triangulate: bool) -> Self {
        self.triangulate = triangulate;
        self
    }
}

/// Build an analysis mesh from a host source.
///
/// # Errors
///
/// Fails with [`crate::CheckError::InvalidMesh`] for a source without
/// vertices or faces, and with the other construction errors of
/// [`Mesh::from_polygons`] for malformed loops or non-finite positions.
pub fn build<S>(source: &S, options: &BuildOptions) -> CheckResult<Mesh>
where
    S: MeshSource + ?Sized,
{
    let geometry = source.extract(options.apply_modifiers);
    let matrix = options.transform.matrix(&source.world_transform());
    build_with_matrix(&geometry, matrix.as_ref(), options.triangulate)
}

/// Build an analysis mesh with an explicit transform.
pub fn build_with_matrix(
    geometry: &SourceMesh,
    matrix: Option<&Matrix4<f64>>,
    triangulate: bool,
) -> CheckResult<Mesh> {
    let positions: Vec<Point3<f64>> = match matrix {
        Some(m) => geometry
            .positions
            .iter()
            .map(|p| m.transform_point(p))
            .collect(),
        None => geometry.positions.clone(),
    };

    if !triangulate || geometry.faces.iter().all(|f| f.len() <= 3) {
        return Mesh::from_polygons(positions, &geometry.faces);
    }

    let vertices: Vec<Vertex> = positions.iter().copied().map(Vertex::new).collect();
    let mut faces: Vec<[u32; 3]> = Vec::with_capacity(geometry.faces.len() * 2);
    for face in &geometry.faces {
        if face.len() < 3 || face.iter().any(|&v| v as usize >= vertices.len()) {
            // Let the mesh constructor report malformed loops.
            return Mesh::from_polygons(positions, &geometry.faces);
        }
        if let [a, b, c] = face[..] {
            faces.push([a, b, c]);
            continue;
        }
        let newell = newell_vector(&vertices, face);
        let normal = newell
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        faces.extend(triangulate_loop(&vertices, face, &normal));
    }
    Mesh::from_polygons(positions, &faces)
}
