//! Interpolation weights: node averaging, face averaging and the cell
//! gradient-reconstruction maps built from them.

use crate::geometry::metrics::{dot, scale, sub};
use crate::mesh::LocalMesh;
use crate::mesh_error::MeshError;
use crate::topology::tags::Contributor;
use std::collections::BTreeMap;

/// Inverse-squared-distance weights of every node over the cells and
/// ghosts touching it, normalized to sum to 1.
pub fn node_weights(mesh: &mut LocalMesh) -> Result<(), MeshError> {
    for n in 0..mesh.nodes.len() {
        let node = &mesh.nodes[n];
        let contributors: Vec<Contributor> = node
            .cells
            .iter()
            .map(|&c| Contributor::Cell(c))
            .chain(node.ghosts.iter().map(|&g| Contributor::Ghost(g)))
            .collect();

        let mut average = BTreeMap::new();
        let mut total = 0.0;
        for who in contributors {
            let d = sub(mesh.nodes[n].coords, mesh.contributor_centroid(who)?);
            let d2 = dot(d, d);
            if !(d2 > 0.0) {
                return Err(MeshError::DegenerateGeometry(format!(
                    "node {} coincides with the centroid of {who}",
                    mesh.nodes[n].global_id
                )));
            }
            let w = 1.0 / d2;
            average.insert(who, w);
            total += w;
        }
        for w in average.values_mut() {
            *w /= total;
        }
        mesh.nodes[n].average = average;
    }
    Ok(())
}

/// Face maps: the mean of the face's node maps, duplicates merged.
pub fn face_weights(mesh: &mut LocalMesh) {
    for face in &mut mesh.faces {
        let share = 1.0 / face.nodes.len() as f64;
        let mut average: BTreeMap<Contributor, f64> = BTreeMap::new();
        for &n in &face.nodes {
            for (&who, &w) in &mesh.nodes[n].average {
                *average.entry(who).or_default() += w * share;
            }
        }
        face.average = average;
    }
}

/// Cell gradient maps from the faces with a value on the far side. The area
/// vector of a face is taken outward from the cell, so it is negated when the
/// cell is the face's neighbour rather than its parent.
pub fn gradient_maps(mesh: &mut LocalMesh) {
    for cell in &mut mesh.cells {
        let mut grad: BTreeMap<Contributor, [f64; 3]> = BTreeMap::new();
        for &f in &cell.faces {
            let face = &mesh.faces[f];
            if !face.tag.has_far_side() {
                continue;
            }
            let sign = if face.parent == cell.id { 1.0 } else { -1.0 };
            let av = scale(face.area_vector(), sign / cell.volume);
            for (&who, &w) in &face.average {
                let g = grad.entry(who).or_insert([0.0; 3]);
                g[0] += w * av[0];
                g[1] += w * av[1];
                g[2] += w * av[2];
            }
        }
        cell.grad_map = grad;
    }
}

/// All three weight passes in order.
pub fn build_weights(mesh: &mut LocalMesh) -> Result<(), MeshError> {
    node_weights(mesh)?;
    face_weights(mesh);
    gradient_maps(mesh);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::faces::construct_faces;
    use crate::algs::local_mesh::LocalMeshBuilder;
    use crate::algs::ownership::Ownership;
    use crate::geometry::metrics::GeometryCalculator;
    use crate::mesh::generate::{BlockSpec, block};
    use crate::topology::cell_type::ElementKind;

    fn prepared(dims: [usize; 3], kind: ElementKind) -> LocalMesh {
        let global = block(&BlockSpec::new(dims, kind)).unwrap();
        let own = Ownership::from_owners(0, 1, vec![0; global.cell_count()]).unwrap();
        let mut mesh = LocalMeshBuilder::new(&global, &own).build(0, 1).unwrap();
        construct_faces(&mut mesh);
        GeometryCalculator::default().compute(&mut mesh).unwrap();
        build_weights(&mut mesh).unwrap();
        mesh
    }

    #[test]
    fn node_and_face_weights_sum_to_one() {
        let mesh = prepared([2, 2, 1], ElementKind::Tetrahedron);
        for node in &mesh.nodes {
            let s: f64 = node.average.values().sum();
            assert!((s - 1.0).abs() < 1e-12);
            assert_eq!(node.average.len(), node.cells.len());
        }
        for face in &mesh.faces {
            let s: f64 = face.average.values().sum();
            assert!((s - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn symmetric_node_weights_are_equal() {
        // the middle node of a 2x1x1 hex strip's shared face is equidistant
        let mesh = prepared([2, 1, 1], ElementKind::Hexahedron);
        let shared = mesh.node_global_to_local[&1];
        let w: Vec<f64> = mesh.nodes[shared].average.values().copied().collect();
        assert_eq!(w.len(), 2);
        assert!((w[0] - 0.5).abs() < 1e-15 && (w[1] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn gradient_maps_are_antisymmetric_across_a_face() {
        let mesh = prepared([2, 1, 1], ElementKind::Hexahedron);
        // only the shared face has a far side: weight 1/2 per cell, area 1, volume 1
        let g0 = mesh.cells[0].grad_map[&Contributor::Cell(0)];
        let g1 = mesh.cells[1].grad_map[&Contributor::Cell(0)];
        assert!((g0[0] - 0.5).abs() < 1e-12);
        assert!((g1[0] + 0.5).abs() < 1e-12);
        assert_eq!(mesh.cells[0].grad_map.len(), 2);
    }
}
