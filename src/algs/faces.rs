//! Face construction with exactly-once deduplication.
//!
//! Every face template of every local cell is matched against the cells
//! incident to the face's first node. A face shared with a higher-id cell is
//! registered once as internal; the same face seen from the higher-id cell is
//! dropped. Faces with no local partner are provisionally tagged region 0.

use crate::mesh::{Face, LocalMesh};
use crate::topology::tags::BoundaryTag;

/// Nodes a neighbouring cell must share with a face to be its far side.
pub const FACE_MATCH_NODES: usize = 3;

/// Build all faces of `mesh`; returns the number of internal faces.
pub fn construct_faces(mesh: &mut LocalMesh) -> usize {
    let mut internal = 0;
    for c in 0..mesh.cells.len() {
        let kind = mesh.cells[c].kind;
        for template in kind.face_templates() {
            let nodes: Vec<usize> = template.iter().map(|&l| mesh.cells[c].nodes[l]).collect();
            let partner = mesh.nodes[nodes[0]]
                .cells
                .iter()
                .copied()
                .find(|&other| other != c && mesh.cells[other].shares_nodes(&nodes, FACE_MATCH_NODES));

            let id = mesh.faces.len();
            let mut face = Face::new(id, nodes, c);
            match partner {
                // registered by the lower-id cell
                Some(other) if other < c => continue,
                Some(other) => {
                    face.neighbor = Some(other);
                    face.tag = BoundaryTag::Internal;
                    mesh.cells[other].faces.push(id);
                    internal += 1;
                }
                None => {}
            }
            mesh.cells[c].faces.push(id);
            mesh.faces.push(face);
        }
    }
    log::debug!(
        "rank {}: {} faces, {internal} internal",
        mesh.rank,
        mesh.faces.len()
    );
    internal
}
