//! Polygon triangulation for n-gon faces.

use earcutr::earcut;
use nalgebra::Vector3;

use crate::types::Vertex;

/// Split a face loop into `len - 2` triangles wound like the face.
///
/// The loop is projected onto the coordinate plane that drops the dominant
/// axis of `normal` and ear-clipped. A fan from the first corner is used
/// for faces without a normal or when ear clipping does not produce a full
/// triangulation.
pub(crate) fn triangulate_loop(
    vertices: &[Vertex],
    face: &[u32],
    normal: &Vector3<f64>,
) -> Vec<[u32; 3]> {
    let n = face.len();
    if n == 3 {
        return vec![[face[0], face[1], face[2]]];
    }
    if *normal == Vector3::zeros() {
        return fan(face);
    }

    let drop_axis = normal.iamax();
    let (u, v) = match drop_axis {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    };

    let mut flat = Vec::with_capacity(n * 2);
    for &vi in face {
        let p = vertices[vi as usize].position;
        flat.push(p[u]);
        flat.push(p[v]);
    }

    let indices = earcut(&flat, &[], 2).unwrap_or_default();
    if indices.len() != 3 * (n - 2) {
        return fan(face);
    }

    indices
        .chunks_exact(3)
        .map(|corner| {
            let tri = [face[corner[0]], face[corner[1]], face[corner[2]]];
            let [a, b, c] = tri.map(|i| vertices[i as usize].position);
            if (b - a).cross(&(c - a)).dot(normal) < 0.0 {
                [tri[0], tri[2], tri[1]]
            } else {
                tri
            }
        })
        .collect()
}

fn fan(face: &[u32]) -> Vec<[u32; 3]> {
    (1..face.len() - 1)
        .map(|i| [face[0], face[i], face[i + 1]])
        .collect()
}
