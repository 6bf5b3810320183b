//! Build one rank's local nodes and cells from the global mesh.
//!
//! Cells are visited in global-id order, so local cell `i` is also metis
//! index `own_range().start + i`. Nodes are numbered in order of first use
//! and every cell keeps its element's canonical node order.

use crate::algs::ownership::Ownership;
use crate::mesh::{Cell, GlobalMesh, LocalMesh, Node};
use crate::mesh_error::MeshError;

pub struct LocalMeshBuilder<'a> {
    global: &'a GlobalMesh,
    ownership: &'a Ownership,
}

impl<'a> LocalMeshBuilder<'a> {
    pub fn new(global: &'a GlobalMesh, ownership: &'a Ownership) -> Self {
        Self { global, ownership }
    }

    pub fn build(&self, rank: usize, nprocs: usize) -> Result<LocalMesh, MeshError> {
        let mut local = LocalMesh::new(rank, nprocs);
        // global node -> local node, None until first use
        let mut seen: Vec<Option<usize>> = vec![None; self.global.node_count()];
        local.cells.reserve(self.ownership.local_count());

        for &global_cell in self.ownership.local_cells() {
            let cell_id = local.cells.len();
            let kind = self.global.cell_kind(global_cell)?;
            let mut nodes = Vec::with_capacity(kind.node_count());
            for &g in self.global.cell_nodes(global_cell)? {
                let slot = seen.get_mut(g).ok_or(MeshError::NodeIndexOutOfRange {
                    index: g,
                    len: self.global.node_count(),
                })?;
                let n = match *slot {
                    Some(n) => n,
                    None => {
                        let n = local.nodes.len();
                        local.nodes.push(Node::new(n, g, self.global.node(g)?));
                        local.node_global_to_local.insert(g, n);
                        *slot = Some(n);
                        n
                    }
                };
                local.nodes[n].cells.push(cell_id);
                nodes.push(n);
            }
            local.cells.push(Cell::new(cell_id, global_cell, kind, nodes));
            local.cell_global_to_local.insert(global_cell, cell_id);
        }

        log::debug!(
            "rank {rank}: {} local cells over {} local nodes",
            local.cells.len(),
            local.nodes.len()
        );
        Ok(local)
    }
}

/// CSR pair of the local cells in global node ids, ready for the dual-graph call.
pub fn owned_csr(local: &LocalMesh) -> (Vec<usize>, Vec<usize>) {
    let mut eptr = Vec::with_capacity(local.cells.len() + 1);
    let mut eind = Vec::new();
    eptr.push(0);
    for cell in &local.cells {
        eind.extend(cell.nodes.iter().map(|&n| local.nodes[n].global_id));
        eptr.push(eind.len());
    }
    (eptr, eind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generate::{BlockSpec, block};
    use crate::topology::cell_type::ElementKind;

    #[test]
    fn nodes_are_shared_between_local_cells() {
        let global = block(&BlockSpec::new([3, 1, 1], ElementKind::Hexahedron)).unwrap();
        let own = Ownership::from_owners(0, 2, vec![0, 0, 1]).unwrap();
        let local = LocalMeshBuilder::new(&global, &own).build(0, 2).unwrap();
        assert_eq!(local.cells.len(), 2);
        assert_eq!(local.nodes.len(), 12);
        assert_eq!(local.cells[1].global_id, 1);
        // the shared quad's nodes know both cells
        let shared = local.node_global_to_local[&1];
        assert_eq!(local.nodes[shared].cells, vec![0, 1]);

        let (eptr, eind) = owned_csr(&local);
        assert_eq!(eptr, vec![0, 8, 16]);
        assert_eq!(&eind[..8], global.cell_nodes(0).unwrap());
    }

    #[test]
    fn rank_without_cells_is_empty() {
        let global = block(&BlockSpec::new([1, 1, 1], ElementKind::Hexahedron)).unwrap();
        let own = Ownership::from_owners(1, 2, vec![0]).unwrap();
        let local = LocalMeshBuilder::new(&global, &own).build(1, 2).unwrap();
        assert!(local.cells.is_empty());
        assert!(local.nodes.is_empty());
        assert_eq!(owned_csr(&local), (vec![0], vec![]));
    }
}
