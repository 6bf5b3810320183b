//! Boundary-condition region assignment for external faces.
//!
//! External faces are matched to boundary-section elements by their sorted
//! global node set. Unmatched faces keep region 0. Every node of an external
//! face records the face's region.

use crate::mesh::{BoundarySection, LocalMesh};
use crate::topology::tags::BoundaryTag;
use std::collections::HashMap;

/// Retag external faces; returns the number of faces left unmatched.
pub fn assign_boundary_regions(mesh: &mut LocalMesh, sections: &[BoundarySection]) -> usize {
    let mut by_nodes: HashMap<Vec<usize>, usize> = HashMap::new();
    for section in sections {
        for element in &section.elements {
            let mut key = element.clone();
            key.sort_unstable();
            by_nodes.insert(key, section.region);
        }
    }

    let mut unmatched = 0;
    for face in mesh.faces.iter_mut().filter(|f| f.tag.is_external()) {
        let mut key: Vec<usize> = face.nodes.iter().map(|&n| mesh.nodes[n].global_id).collect();
        key.sort_unstable();
        let region = match by_nodes.get(&key) {
            Some(&r) => r,
            None => {
                unmatched += 1;
                0
            }
        };
        face.tag = BoundaryTag::Region(region);
        for &n in &face.nodes {
            mesh.nodes[n].boundary_regions.insert(region);
        }
    }

    if !sections.is_empty() && unmatched > 0 {
        log::warn!(
            "rank {}: {unmatched} external faces match no boundary element, left in region 0",
            mesh.rank
        );
    }
    unmatched
}
