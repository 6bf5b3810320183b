//! Face and cell metrics of a local mesh.
//!
//! - Cell centroid: mean of the cell's nodes.
//! - Face centroid: mean of the face's nodes; area vector: half the sum of
//!   `(x_i - c) × (x_{i+1} - c)` around the node cycle, which is exact for
//!   planar polygons and the usual average for warped quads.
//! - Cell volume: sum of the cones from the cell centroid to each face,
//!   `area * h / 3` with `h = |n · (face centroid - cell centroid)|`.
//! - Length scale: the smallest such height `h`.
//!
//! Every face normal must point away from its parent's centroid. What happens
//! to one that does not is set by [`OrientationPolicy`].

use crate::config::OrientationPolicy;
use crate::mesh::LocalMesh;
use crate::mesh_error::MeshError;
use itertools::Itertools;

pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Arithmetic mean of `points`; the origin for an empty slice.
pub fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    if points.is_empty() {
        return [0.0; 3];
    }
    let sum = points.iter().fold([0.0; 3], |acc, &p| add(acc, p));
    scale(sum, 1.0 / points.len() as f64)
}

/// Centroid and area vector of a polygon given in winding order.
pub fn polygon_area_vector(points: &[[f64; 3]]) -> ([f64; 3], [f64; 3]) {
    let c = centroid(points);
    let area = points
        .iter()
        .circular_tuple_windows()
        .fold([0.0; 3], |acc, (&a, &b)| {
            add(acc, scale(cross(sub(a, c), sub(b, c)), 0.5))
        });
    (c, area)
}

/// Geometry pass over a mesh whose faces are already constructed.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryCalculator {
    pub policy: OrientationPolicy,
}

impl GeometryCalculator {
    pub fn new(policy: OrientationPolicy) -> Self {
        Self { policy }
    }

    /// Fill centroids, areas, normals, volumes and length scales. Returns the
    /// number of faces found wound into their parent.
    pub fn compute(&self, mesh: &mut LocalMesh) -> Result<usize, MeshError> {
        for cell in &mut mesh.cells {
            let pts: Vec<[f64; 3]> = cell.nodes.iter().map(|&n| mesh.nodes[n].coords).collect();
            cell.centroid = centroid(&pts);
        }

        let mut misoriented = 0;
        for face in &mut mesh.faces {
            let pts: Vec<[f64; 3]> = face.nodes.iter().map(|&n| mesh.nodes[n].coords).collect();
            let (c, area_vec) = polygon_area_vector(&pts);
            let area = norm(area_vec);
            if !(area > 0.0) {
                return Err(MeshError::DegenerateGeometry(format!(
                    "face {} of cell {} has zero area",
                    face.id, mesh.cells[face.parent].global_id
                )));
            }
            face.centroid = c;
            face.area = area;
            face.normal = scale(area_vec, 1.0 / area);

            let outward = sub(c, mesh.cells[face.parent].centroid);
            if dot(face.normal, outward) <= 0.0 {
                misoriented += 1;
                match self.policy {
                    OrientationPolicy::Correct => {
                        log::warn!(
                            "face {} points into cell {}; reversing its winding",
                            face.id,
                            mesh.cells[face.parent].global_id
                        );
                        face.nodes.reverse();
                        face.normal = scale(face.normal, -1.0);
                    }
                    OrientationPolicy::WarnOnly => {
                        log::warn!(
                            "face {} points into cell {}",
                            face.id,
                            mesh.cells[face.parent].global_id
                        );
                    }
                }
            }
        }

        for cell in &mut mesh.cells {
            let mut volume = 0.0;
            let mut length_scale = f64::INFINITY;
            for &f in &cell.faces {
                let face = &mesh.faces[f];
                let h = dot(face.normal, sub(face.centroid, cell.centroid)).abs();
                volume += face.area * h / 3.0;
                length_scale = length_scale.min(h);
            }
            if !(volume > 0.0) {
                return Err(MeshError::DegenerateGeometry(format!(
                    "cell {} has non-positive volume {volume}",
                    cell.global_id
                )));
            }
            cell.volume = volume;
            cell.length_scale = length_scale;
        }
        Ok(misoriented)
    }
}
