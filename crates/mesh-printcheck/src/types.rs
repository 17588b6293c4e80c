//! Core mesh data types.
//!
//! [`Mesh`] is an immutable snapshot: an arena of vertices, edges and faces
//! addressed by integer index. It is built once per analysis from a host
//! mesh (see [`crate::source::build`]) and never changes afterwards, so every
//! check can borrow it freely, including from several threads at once.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use std::ops::Range;

use crate::error::{CheckError, CheckResult};
use crate::finding::ElementCounts;
use crate::triangulate::triangulate_loop;

/// A vertex of the analysis mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// 3D position in working units (after any baked transform).
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a vertex from coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// One traversal of an edge by a face loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUse {
    /// Face whose loop contains the edge.
    pub face: u32,
    /// True if the face walks the edge from `vertices[0]` to `vertices[1]`.
    pub forward: bool,
}

/// An edge: an unordered vertex pair plus every face that uses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    vertices: [u32; 2],
    uses: Vec<EdgeUse>,
    manifold: bool,
    contiguous: bool,
}

impl Edge {
    /// The two end vertices, in the order the first face walked them.
    #[inline]
    pub fn vertices(&self) -> [u32; 2] {
        self.vertices
    }

    /// Every face traversal of this edge, in face order.
    #[inline]
    pub fn uses(&self) -> &[EdgeUse] {
        &self.uses
    }

    /// Indices of adjacent faces.
    pub fn faces(&self) -> impl Iterator<Item = u32> + '_ {
        self.uses.iter().map(|u| u.face)
    }

    /// Number of adjacent faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.uses.len()
    }

    /// True if exactly two faces share this edge.
    #[inline]
    pub fn is_manifold(&self) -> bool {
        self.manifold
    }

    /// True if the edge is manifold and its two faces walk it in opposite
    /// directions (consistent winding across the edge).
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    /// True if only one face uses this edge.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.uses.len() == 1
    }
}

/// A polygon face with cached normal and area.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    vertices: Vec<u32>,
    edges: Vec<u32>,
    normal: Vector3<f64>,
    area: f64,
    triangles: Range<u32>,
}

impl Face {
    /// Vertex loop in winding order.
    #[inline]
    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }

    /// Edge loop; `edges()[i]` joins `vertices()[i]` and `vertices()[i + 1]`.
    #[inline]
    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false; faces have at least three corners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Unit normal (Newell), or the zero vector for a face without area.
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Unit normal, or `None` for a face without area.
    #[inline]
    pub fn unit_normal(&self) -> Option<Vector3<f64>> {
        if self.normal == Vector3::zeros() {
            None
        } else {
            Some(self.normal)
        }
    }

    /// Polygon area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Range of this face's triangles in [`Mesh::triangles`].
    #[inline]
    pub fn triangle_range(&self) -> Range<usize> {
        self.triangles.start as usize..self.triangles.end as usize
    }
}

/// Immutable polygon mesh with edge adjacency and an internal triangulation.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    triangles: Vec<[u32; 3]>,
    tri_face: Vec<u32>,
}

impl Mesh {
    /// Build a mesh from positions and per-face vertex loops.
    ///
    /// # Errors
    ///
    /// - [`CheckError::InvalidMesh`] if there are no vertices or no faces, a
    ///   face has fewer than three corners, or a loop repeats a vertex.
    /// - [`CheckError::InvalidVertexIndex`] if a loop references a missing vertex.
    /// - [`CheckError::InvalidCoordinate`] if a position is NaN or infinite.
    pub fn from_polygons<F>(positions: Vec<Point3<f64>>, faces: &[F]) -> CheckResult<Self>
    where
        F: AsRef<[u32]>,
    {
        if positions.is_empty() {
            return Err(CheckError::invalid_mesh("mesh has no vertices"));
        }
        if faces.is_empty() {
            return Err(CheckError::invalid_mesh("mesh has no faces"));
        }

        for (vertex_index, p) in positions.iter().enumerate() {
            for (coordinate, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
                if !value.is_finite() {
                    return Err(CheckError::InvalidCoordinate {
                        vertex_index,
                        coordinate,
                        value,
                    });
                }
            }
        }

        let vertex_count = positions.len();
        for (face_index, face) in faces.iter().enumerate() {
            let face = face.as_ref();
            if face.len() < 3 {
                return Err(CheckError::invalid_mesh(format!(
                    "face {} has {} corners",
                    face_index,
                    face.len()
                )));
            }
            for (i, &v) in face.iter().enumerate() {
                if v as usize >= vertex_count {
                    return Err(CheckError::InvalidVertexIndex {
                        face_index,
                        vertex_index: v,
                        vertex_count,
                    });
                }
                if face[..i].contains(&v) {
                    return Err(CheckError::invalid_mesh(format!(
                        "face {} uses vertex {} twice",
                        face_index, v
                    )));
                }
            }
        }

        let vertices: Vec<Vertex> = positions.into_iter().map(Vertex::new).collect();

        let mut edges: Vec<Edge> = Vec::new();
        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();
        let mut mesh_faces = Vec::with_capacity(faces.len());
        let mut triangles = Vec::with_capacity(faces.len() * 2);
        let mut tri_face = Vec::with_capacity(faces.len() * 2);

        for (face_idx, face) in faces.iter().enumerate() {
            let face = face.as_ref();
            let n = face.len();
            let mut face_edges = Vec::with_capacity(n);

            for i in 0..n {
                let a = face[i];
                let b = face[(i + 1) % n];
                let key = (a.min(b), a.max(b));
                let edge_idx = *edge_map.entry(key).or_insert_with(|| {
                    edges.push(Edge {
                        vertices: [a, b],
                        uses: Vec::with_capacity(2),
                        manifold: false,
                        contiguous: false,
                    });
                    (edges.len() - 1) as u32
                });
                let edge = &mut edges[edge_idx as usize];
                edge.uses.push(EdgeUse {
                    face: face_idx as u32,
                    forward: edge.vertices[0] == a,
                });
                face_edges.push(edge_idx);
            }

            let newell = newell_vector(&vertices, face);
            let length = newell.norm();
            let normal = if length > f64::EPSILON {
                newell / length
            } else {
                Vector3::zeros()
            };

            let start = triangles.len() as u32;
            for tri in triangulate_loop(&vertices, face, &normal) {
                triangles.push(tri);
                tri_face.push(face_idx as u32);
            }

            mesh_faces.push(Face {
                vertices: face.to_vec(),
                edges: face_edges,
                normal,
                area: 0.5 * length,
                triangles: start..triangles.len() as u32,
            });
        }

        for edge in &mut edges {
            edge.manifold = edge.uses.len() == 2;
            edge.contiguous = edge.manifold && edge.uses[0].forward != edge.uses[1].forward;
        }

        Ok(Self {
            vertices,
            edges,
            faces: mesh_faces,
            triangles,
            tri_face,
        })
    }

    /// Build a mesh from positions and triangle indices.
    pub fn from_triangles(positions: Vec<Point3<f64>>, faces: &[[u32; 3]]) -> CheckResult<Self> {
        Self::from_polygons(positions, faces)
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles in the internal triangulation.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Element counts, used to detect stale findings.
    pub fn element_counts(&self) -> ElementCounts {
        ElementCounts {
            vertices: self.vertices.len(),
            edges: self.edges.len(),
            faces: self.faces.len(),
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, vertex: u32) -> Point3<f64> {
        self.vertices[vertex as usize].position
    }

    /// Internal triangulation; every face contributes `len() - 2` triangles.
    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Face that owns the given triangle.
    #[inline]
    pub fn triangle_face(&self, triangle: usize) -> u32 {
        self.tri_face[triangle]
    }

    /// Geometry of one triangle of the internal triangulation.
    #[inline]
    pub fn triangle(&self, triangle: usize) -> Triangle {
        let [a, b, c] = self.triangles[triangle];
        Triangle::new(self.position(a), self.position(b), self.position(c))
    }

    /// Iterate over all triangles of the internal triangulation.
    pub fn triangle_iter(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangles.len()).map(|i| self.triangle(i))
    }

    /// Length of an edge.
    pub fn edge_length(&self, edge: usize) -> f64 {
        let [a, b] = self.edges[edge].vertices;
        (self.position(b) - self.position(a)).norm()
    }

    /// True if two faces have at least one vertex in common.
    pub fn faces_share_vertex(&self, a: usize, b: usize) -> bool {
        let fb = &self.faces[b].vertices;
        self.faces[a].vertices.iter().any(|v| fb.contains(v))
    }

    /// Axis-aligned bounding box as (min, max).
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let first = self.vertices[0].position;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            min = min.inf(&v.position);
            max = max.sup(&v.position);
        }
        (min, max)
    }
}

/// Newell's method: twice the area-weighted normal of a (possibly non-planar) loop.
pub(crate) fn newell_vector(vertices: &[Vertex], face: &[u32]) -> Vector3<f64> {
    let n = face.len();
    // Relative to the first corner to keep precision for meshes far from the origin.
    let origin = vertices[face[0] as usize].position;
    let mut sum = Vector3::zeros();
    for i in 0..n {
        let p = vertices[face[i] as usize].position - origin;
        let q = vertices[face[(i + 1) % n] as usize].position - origin;
        sum += p.cross(&q);
    }
    sum
}

/// A triangle with owned vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the unnormalized normal vector (cross product of edges).
    /// The magnitude equals twice the triangle area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the unit normal vector.
    /// Returns None for degenerate triangles.
    #[inline]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len = n.norm();
        if len > f64::EPSILON {
            Some(n / len)
        } else {
            None
        }
    }

    /// Compute the area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid (center of mass).
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Vertices as an array.
    #[inline]
    pub fn points(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}
