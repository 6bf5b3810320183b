//! Build a CSR (compressed-sparse-row) *dual graph* of a cell list.
//
// Each *cell* is a vertex; an undirected edge joins two cells that share at
// least `ncommon` nodes. With `ncommon = 3` this is face adjacency for
// tetrahedral-dominant meshes; with `ncommon = 1` any shared node counts.
//
// Returned in METIS-ready CSR pairs:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of cell *i*
// * `adjncy`                 = concatenated neighbour vertices, ascending per row
//
// The graph is **symmetrised** (i<->j appear in both lists) and **self-free**.

use crate::mesh_error::MeshError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::ops::Range;

/// CSR pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualGraph {
    pub xadj: Vec<usize>,
    pub adjncy: Vec<usize>,
}

impl DualGraph {
    /// Dual graph of the elements `eptr`/`eind` (element `e` uses nodes
    /// `eind[eptr[e]..eptr[e+1]]`).
    pub fn from_elements(eptr: &[usize], eind: &[usize], ncommon: usize) -> Result<Self, MeshError> {
        check_csr(eptr, eind)?;
        if ncommon == 0 {
            return Err(MeshError::Config("ncommon must be at least 1".into()));
        }
        let n = eptr.len().saturating_sub(1);
        let nnodes = eind.iter().max().map_or(0, |&m| m + 1);

        // node -> elements, ascending
        let mut incidence: Vec<Vec<usize>> = vec![Vec::new(); nnodes];
        for e in 0..n {
            for &v in &eind[eptr[e]..eptr[e + 1]] {
                incidence[v].push(e);
            }
        }

        let rows: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|e| {
                let mut shared: HashMap<usize, usize> = HashMap::new();
                for &v in &eind[eptr[e]..eptr[e + 1]] {
                    for &other in &incidence[v] {
                        if other != e {
                            *shared.entry(other).or_default() += 1;
                        }
                    }
                }
                let mut row: Vec<usize> = shared
                    .into_iter()
                    .filter(|&(_, count)| count >= ncommon)
                    .map(|(other, _)| other)
                    .collect();
                row.sort_unstable();
                row
            })
            .collect();

        let mut xadj = Vec::with_capacity(n + 1);
        let mut adjncy = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        xadj.push(0);
        for row in rows {
            adjncy.extend(row);
            xadj.push(adjncy.len());
        }
        Ok(DualGraph { xadj, adjncy })
    }

    pub fn vertex_count(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        match (self.xadj.get(v), self.xadj.get(v + 1)) {
            (Some(&lo), Some(&hi)) => &self.adjncy[lo..hi],
            _ => &[],
        }
    }

    /// Undirected edges whose endpoints lie in different parts.
    pub fn edge_cut(&self, part: &[usize]) -> usize {
        (0..self.vertex_count())
            .map(|u| {
                self.neighbors(u)
                    .iter()
                    .filter(|&&v| u < v && part.get(u) != part.get(v))
                    .count()
            })
            .sum()
    }

    /// Rows `range`, with neighbour ids left in the full graph's numbering.
    pub fn rows(&self, range: Range<usize>) -> Result<DualGraph, MeshError> {
        if range.start > range.end || range.end > self.vertex_count() {
            return Err(MeshError::CellIndexOutOfRange {
                index: range.end,
                len: self.vertex_count(),
            });
        }
        let base = self.xadj[range.start];
        Ok(DualGraph {
            xadj: self.xadj[range.start..=range.end]
                .iter()
                .map(|&o| o - base)
                .collect(),
            adjncy: self.adjncy[base..self.xadj[range.end]].to_vec(),
        })
    }
}

/// Reject CSR pairs whose offsets are not a monotone cover of `eind`.
pub fn check_csr(eptr: &[usize], eind: &[usize]) -> Result<(), MeshError> {
    match (eptr.first(), eptr.last()) {
        (Some(0), Some(&last)) if last == eind.len() => {}
        _ => {
            return Err(MeshError::InvalidConnectivity(format!(
                "CSR offsets do not span {} indices",
                eind.len()
            )));
        }
    }
    if eptr.windows(2).any(|w| w[0] > w[1]) {
        return Err(MeshError::InvalidConnectivity(
            "CSR offsets are not monotone".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // two tets sharing the face {1, 2, 3}, a third touching only node 4
    fn tiny_mesh() -> (Vec<usize>, Vec<usize>) {
        (
            vec![0, 4, 8, 12],
            vec![0, 1, 2, 3, 1, 2, 3, 4, 4, 5, 6, 7],
        )
    }

    #[test]
    fn face_threshold_drops_vertex_neighbours() {
        let (eptr, eind) = tiny_mesh();
        let dg = DualGraph::from_elements(&eptr, &eind, 3).unwrap();
        assert_eq!(dg.xadj, vec![0, 1, 2, 2]);
        assert_eq!(dg.adjncy, vec![1, 0]);
    }

    #[test]
    fn single_node_threshold_links_everything_touching() {
        let (eptr, eind) = tiny_mesh();
        let dg = DualGraph::from_elements(&eptr, &eind, 1).unwrap();
        assert_eq!(dg.neighbors(0), &[1]);
        assert_eq!(dg.neighbors(1), &[0, 2]);
        assert_eq!(dg.neighbors(2), &[1]);
        assert_eq!(dg.edge_cut(&[0, 0, 1]), 1);
        assert_eq!(dg.edge_cut(&[0, 1, 0]), 2);
    }

    #[test]
    fn rows_keep_global_numbering() {
        let (eptr, eind) = tiny_mesh();
        let dg = DualGraph::from_elements(&eptr, &eind, 1).unwrap();
        let tail = dg.rows(1..3).unwrap();
        assert_eq!(tail.xadj, vec![0, 2, 3]);
        assert_eq!(tail.adjncy, vec![0, 2, 1]);
        assert!(dg.rows(2..4).is_err());
    }

    #[test]
    fn malformed_offsets_are_rejected() {
        assert!(DualGraph::from_elements(&[0, 4, 3], &[0, 1, 2, 3], 1).is_err());
        assert!(DualGraph::from_elements(&[0, 5], &[0, 1, 2, 3], 1).is_err());
    }
}
