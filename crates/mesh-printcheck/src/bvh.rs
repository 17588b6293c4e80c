//! Bounding-volume hierarchy over the triangles of a [`Mesh`].
//!
//! Built once per mesh and read-only afterwards, so the self-intersection
//! and thickness checks can share one tree and query it from many threads.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::types::{Mesh, Triangle};

/// Padding added to every box so touching geometry still overlaps.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a triangle.
    pub fn from_triangle(tri: &Triangle) -> Self {
        Self {
            min: tri.v0.inf(&tri.v1).inf(&tri.v2),
            max: tri.v0.sup(&tri.v1).sup(&tri.v2),
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Expand AABB by epsilon for numerical robustness.
    pub fn expand(&self, epsilon: f64) -> Self {
        let pad = Vector3::repeat(epsilon);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// True if the boxes overlap or touch.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Euclidean distance between the boxes; zero if they overlap or touch.
    pub fn distance(&self, other: &Aabb) -> f64 {
        let gap = Vector3::new(
            (other.min.x - self.max.x).max(self.min.x - other.max.x).max(0.0),
            (other.min.y - self.max.y).max(self.min.y - other.max.y).max(0.0),
            (other.min.z - self.max.z).max(self.min.z - other.max.z).max(0.0),
        );
        gap.norm()
    }

    /// Ray-AABB slab test.
    /// Returns (t_near, t_far) or None if no intersection.
    pub fn ray_intersect(
        &self,
        origin: &Point3<f64>,
        dir_inv: &Vector3<f64>,
    ) -> Option<(f64, f64)> {
        let t1 = (self.min.x - origin.x) * dir_inv.x;
        let t2 = (self.max.x - origin.x) * dir_inv.x;
        let t3 = (self.min.y - origin.y) * dir_inv.y;
        let t4 = (self.max.y - origin.y) * dir_inv.y;
        let t5 = (self.min.z - origin.z) * dir_inv.z;
        let t6 = (self.max.z - origin.z) * dir_inv.z;

        let t_min = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let t_max = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

/// A ray hit: distance along the ray and the triangle hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f64,
    pub triangle: usize,
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        aabb: Aabb,
        triangle: usize,
    },
    Internal {
        aabb: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn build(boxes: &[Aabb], centroids: &[Point3<f64>], indices: &mut [usize]) -> Option<Self> {
        match indices {
            [] => return None,
            [idx] => {
                return Some(BvhNode::Leaf {
                    aabb: boxes[*idx],
                    triangle: *idx,
                });
            }
            _ => {}
        }

        let combined = indices[1..]
            .iter()
            .fold(boxes[indices[0]], |acc, &i| acc.union(&boxes[i]));

        // Split at the median centroid along the longest axis
        let axis = combined.extent().imax();
        indices.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));
        let mid = indices.len() / 2;
        let (left_indices, right_indices) = indices.split_at_mut(mid);

        let left = BvhNode::build(boxes, centroids, left_indices);
        let right = BvhNode::build(boxes, centroids, right_indices);

        match (left, right) {
            (Some(l), Some(r)) => Some(BvhNode::Internal {
                aabb: combined,
                left: Box::new(l),
                right: Box::new(r),
            }),
            (Some(n), None) | (None, Some(n)) => Some(n),
            (None, None) => None,
        }
    }

    fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Triangle BVH for a mesh.
#[derive(Debug)]
pub struct Bvh {
    root: Option<BvhNode>,
    triangles: Vec<Triangle>,
    epsilon: f64,
}

impl Bvh {
    /// Build over the mesh's triangulation with [`DEFAULT_EPSILON`] padding.
    pub fn build(mesh: &Mesh) -> Self {
        Self::build_with_epsilon(mesh, DEFAULT_EPSILON)
    }

    pub fn build_with_epsilon(mesh: &Mesh, epsilon: f64) -> Self {
        let triangles: Vec<Triangle> = mesh.triangle_iter().collect();
        let boxes: Vec<Aabb> = triangles
            .iter()
            .map(|t| Aabb::from_triangle(t).expand(epsilon))
            .collect();
        let centroids: Vec<Point3<f64>> = triangles.iter().map(Triangle::centroid).collect();
        let mut indices: Vec<usize> = (0..triangles.len()).collect();
        let root = BvhNode::build(&boxes, &centroids, &mut indices);
        debug!(triangles = triangles.len(), "Built triangle BVH");
        Self {
            root,
            triangles,
            epsilon,
        }
    }

    /// Number of triangles indexed.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Geometry of an indexed triangle.
    pub fn triangle(&self, idx: usize) -> &Triangle {
        &self.triangles[idx]
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|r| *r.aabb())
    }

    /// Every unordered pair of triangles whose boxes overlap, as `(a, b)`
    /// with `a < b`.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if let Some(root) = &self.root {
            self_pairs(root, &mut pairs);
        }
        debug!(pairs = pairs.len(), "Collected overlapping box pairs");
        pairs
    }

    /// Closest hit along a ray within `max_dist`, considering only triangles
    /// for which `accept` returns true.
    pub fn cast_ray<F>(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_dist: f64,
        accept: F,
    ) -> Option<RayHit>
    where
        F: Fn(usize) -> bool,
    {
        let root = self.root.as_ref()?;
        let dir_inv = direction.map(|d| {
            if d.abs() > self.epsilon {
                1.0 / d
            } else {
                f64::MAX
            }
        });
        let ray = Ray {
            origin,
            direction,
            dir_inv: &dir_inv,
        };
        trace_ray(root, &ray, &self.triangles, max_dist, &accept)
    }
}

fn self_pairs(node: &BvhNode, out: &mut Vec<(usize, usize)>) {
    if let BvhNode::Internal { left, right, .. } = node {
        self_pairs(left, out);
        self_pairs(right, out);
        cross_pairs(left, right, out);
    }
}

fn cross_pairs(a: &BvhNode, b: &BvhNode, out: &mut Vec<(usize, usize)>) {
    if !a.aabb().overlaps(b.aabb()) {
        return;
    }
    match (a, b) {
        (BvhNode::Leaf { triangle: ta, .. }, BvhNode::Leaf { triangle: tb, .. }) => {
            out.push(((*ta).min(*tb), (*ta).max(*tb)));
        }
        (BvhNode::Leaf { .. }, BvhNode::Internal { left, right, .. }) => {
            cross_pairs(a, left, out);
            cross_pairs(a, right, out);
        }
        (BvhNode::Internal { left, right, .. }, _) => {
            cross_pairs(left, b, out);
            cross_pairs(right, b, out);
        }
    }
}

struct Ray<'a> {
    origin: &'a Point3<f64>,
    direction: &'a Vector3<f64>,
    dir_inv: &'a Vector3<f64>,
}

fn trace_ray<F>(
    node: &BvhNode,
    ray: &Ray<'_>,
    triangles: &[Triangle],
    max_dist: f64,
    accept: &F,
) -> Option<RayHit>
where
    F: Fn(usize) -> bool,
{
    match node.aabb().ray_intersect(ray.origin, ray.dir_inv) {
        Some((t_near, _)) if t_near <= max_dist => {}
        _ => return None,
    }

    match node {
        BvhNode::Leaf { triangle, .. } => {
            if !accept(*triangle) {
                return None;
            }
            ray_triangle_intersect(ray.origin, ray.direction, &triangles[*triangle])
                .filter(|&t| t <= max_dist)
                .map(|distance| RayHit {
                    distance,
                    triangle: *triangle,
                })
        }
        BvhNode::Internal { left, right, .. } => {
            let hit_left = trace_ray(left, ray, triangles, max_dist, accept);
            let max_right = hit_left.map_or(max_dist, |h| h.distance);
            let hit_right = trace_ray(right, ray, triangles, max_right, accept);
            match (hit_left, hit_right) {
                (Some(l), Some(r)) => Some(if l.distance <= r.distance { l } else { r }),
                (Some(h), None) | (None, Some(h)) => Some(h),
                (None, None) => None,
            }
        }
    }
}

/// Möller–Trumbore ray-triangle intersection.
/// Returns the distance t along the ray if the ray hits in front of the origin.
pub fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
) -> Option<f64> {
    const PARALLEL_EPS: f64 = 1e-14;
    // Rays through a shared edge must hit at least one side
    const BARY_EPS: f64 = 1e-12;

    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray is parallel to triangle
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);
    if !(-BARY_EPS..=1.0 + BARY_EPS).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < -BARY_EPS || u + v > 1.0 + BARY_EPS {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > 0.0 { Some(t) } else { None }
}
