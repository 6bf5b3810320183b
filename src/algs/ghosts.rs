//! Ghost discovery across partition boundaries.
//!
//! A face still tagged as an external boundary after face construction may
//! in fact abut a cell owned by another rank. The parent's dual-graph row
//! names every cell touching the parent, so each remote entry is checked
//! against the *global* connectivity: sharing at least
//! [`FACE_MATCH_NODES`] of the face's nodes confirms the far side, and the
//! remote cell is materialized once as a [`Ghost`].
//!
//! Remote cells sharing only one or two nodes with a face are remembered per
//! node. Once discovery is complete, a node picks up such a cell only if it
//! became a ghost through some other face; otherwise no centroid is known
//! for it locally and it cannot contribute to averaging.

use crate::algs::dual_graph::DualGraph;
use crate::algs::faces::FACE_MATCH_NODES;
use crate::algs::ownership::Ownership;
use crate::mesh::{GlobalMesh, Ghost, LocalMesh};
use crate::mesh_error::MeshError;
use crate::topology::tags::BoundaryTag;

pub struct GhostManager<'a> {
    global: &'a GlobalMesh,
    ownership: &'a Ownership,
    adjacency: &'a DualGraph,
}

impl<'a> GhostManager<'a> {
    /// `adjacency` holds one row per local cell, in metis-index space.
    pub fn new(global: &'a GlobalMesh, ownership: &'a Ownership, adjacency: &'a DualGraph) -> Self {
        Self {
            global,
            ownership,
            adjacency,
        }
    }

    /// Materialize ghosts and retag partition faces; returns the number of
    /// partition faces.
    pub fn discover(&self, mesh: &mut LocalMesh) -> Result<usize, MeshError> {
        if self.adjacency.vertex_count() != mesh.cells.len() {
            return Err(MeshError::CollectiveMismatch(format!(
                "dual graph has {} rows for {} local cells",
                self.adjacency.vertex_count(),
                mesh.cells.len()
            )));
        }
        let own = self.ownership.own_range();
        // (local node, remote global cell) sharing fewer than a face's worth of nodes
        let mut speculative: Vec<(usize, usize)> = Vec::new();
        let mut partition_faces = 0;

        for f in 0..mesh.faces.len() {
            if !mesh.faces[f].tag.is_external() {
                continue;
            }
            let parent = mesh.faces[f].parent;
            let face_globals: Vec<usize> = mesh.faces[f]
                .nodes
                .iter()
                .map(|&n| mesh.nodes[n].global_id)
                .collect();

            for &metis in self.adjacency.neighbors(parent) {
                if own.contains(&metis) {
                    continue;
                }
                let remote = self.ownership.metis_to_global(metis)?;
                let remote_nodes = self.global.cell_nodes(remote)?;
                let shared: Vec<usize> = mesh.faces[f]
                    .nodes
                    .iter()
                    .zip(&face_globals)
                    .filter(|&(_, g)| remote_nodes.contains(g))
                    .map(|(&n, _)| n)
                    .collect();

                if shared.len() >= FACE_MATCH_NODES {
                    let g = self.materialize(mesh, remote)?;
                    mesh.faces[f].tag = BoundaryTag::PartitionGhost(g);
                    for &n in &mesh.faces[f].nodes {
                        mesh.nodes[n].ghosts.insert(g);
                    }
                    partition_faces += 1;
                    log::trace!("face {f} borders remote cell {remote} as ghost {g}");
                    break;
                }
                speculative.extend(shared.into_iter().map(|n| (n, remote)));
            }
        }

        for (n, remote) in speculative {
            if let Some(&g) = mesh.ghost_global_to_local.get(&remote) {
                mesh.nodes[n].ghosts.insert(g);
            }
        }

        log::debug!(
            "rank {}: {} ghosts behind {partition_faces} partition faces",
            mesh.rank,
            mesh.ghosts.len()
        );
        Ok(partition_faces)
    }

    /// Local ghost id of remote cell `remote`, creating it on first use.
    fn materialize(&self, mesh: &mut LocalMesh, remote: usize) -> Result<usize, MeshError> {
        if let Some(&g) = mesh.ghost_global_to_local.get(&remote) {
            return Ok(g);
        }
        let g = mesh.ghosts.len();
        mesh.ghosts.push(Ghost {
            id: g,
            global_id: remote,
            owner: self.ownership.owner(remote)?,
            centroid: self.global.cell_centroid(remote)?,
        });
        mesh.ghost_global_to_local.insert(remote, g);
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::faces::construct_faces;
    use crate::algs::local_mesh::LocalMeshBuilder;
    use crate::mesh::generate::{BlockSpec, block};
    use crate::topology::cell_type::ElementKind;

    // serial stand-in for the collective dual-graph call
    fn local_rows(global: &GlobalMesh, own: &Ownership) -> DualGraph {
        let mut eptr = vec![0];
        let mut eind = Vec::new();
        for m in 0..global.cell_count() {
            eind.extend_from_slice(global.cell_nodes(own.metis_to_global(m).unwrap()).unwrap());
            eptr.push(eind.len());
        }
        DualGraph::from_elements(&eptr, &eind, 1)
            .unwrap()
            .rows(own.own_range())
            .unwrap()
    }

    #[test]
    fn hex_pair_gets_one_ghost_per_side() {
        let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
        for rank in 0..2 {
            let own = Ownership::from_owners(rank, 2, vec![0, 1]).unwrap();
            let mut mesh = LocalMeshBuilder::new(&global, &own).build(rank, 2).unwrap();
            construct_faces(&mut mesh);
            let rows = local_rows(&global, &own);
            let partition = GhostManager::new(&global, &own, &rows).discover(&mut mesh).unwrap();
            assert_eq!(partition, 1);
            assert_eq!(mesh.ghosts.len(), 1);
            let ghost = &mesh.ghosts[0];
            assert_eq!((ghost.global_id, ghost.owner), (1 - rank, 1 - rank));
            assert_eq!(ghost.centroid, global.cell_centroid(1 - rank).unwrap());
            assert_eq!(mesh.boundary_faces().count(), 5);
            // the shared quad's four nodes see the ghost, the far ones do not
            let touched = mesh.nodes.iter().filter(|n| n.ghosts.contains(&0)).count();
            assert_eq!(touched, 4);
        }
    }

    #[test]
    fn diagonal_owner_sees_each_ghost_once() {
        // 2x2x1 hexes: rank 0 owns the diagonal pair 0 and 3
        let global = block(&BlockSpec::new([2, 2, 1], ElementKind::Hexahedron)).unwrap();
        let own = Ownership::from_owners(0, 2, vec![0, 1, 1, 0]).unwrap();
        let mut mesh = LocalMeshBuilder::new(&global, &own).build(0, 2).unwrap();
        construct_faces(&mut mesh);
        let rows = local_rows(&global, &own);
        let partition = GhostManager::new(&global, &own, &rows).discover(&mut mesh).unwrap();
        assert_eq!(partition, 4);
        assert_eq!(mesh.ghosts.len(), 2);
        // the shared vertical edge touches both ghosts
        let centre = mesh.nodes.iter().filter(|n| n.ghosts.len() == 2).count();
        assert_eq!(centre, 2);
    }

    #[test]
    fn row_count_must_match_local_cells() {
        let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
        let own = Ownership::from_owners(0, 2, vec![0, 1]).unwrap();
        let mut mesh = LocalMeshBuilder::new(&global, &own).build(0, 2).unwrap();
        let rows = DualGraph::default();
        assert!(GhostManager::new(&global, &own, &rows).discover(&mut mesh).is_err());
    }
}
