//! Global cell ownership after k-way partitioning.
//!
//! Before partitioning, cells are striped over ranks in equal blocks with the
//! remainder on the highest rank. After partitioning, every rank knows the
//! destination of every global cell and renumbers the cells it will own into
//! a contiguous "metis index" range, ordered by global id.

use crate::algs::communicator::{CommTag, Communicator, all_gather_words};
use crate::algs::partition::check_elmdist;
use crate::mesh_error::MeshError;
use std::ops::Range;

/// Striped distribution of `ncells` over `nprocs` ranks:
/// `elmdist[p] = p * (ncells / nprocs)`, the last rank taking the remainder.
pub fn initial_distribution(ncells: usize, nprocs: usize) -> Result<Vec<usize>, MeshError> {
    if nprocs == 0 {
        return Err(MeshError::InvalidDistribution("no ranks".into()));
    }
    let block = ncells / nprocs;
    let mut elmdist: Vec<usize> = (0..nprocs).map(|p| p * block).collect();
    elmdist.push(ncells);
    Ok(elmdist)
}

/// Owner of every global cell plus the derived renumbering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ownership {
    rank: usize,
    cell_owner: Vec<usize>,
    counts: Vec<usize>,
    /// `offsets[p]..offsets[p + 1]` is rank `p`'s metis-index range.
    offsets: Vec<usize>,
    metis_to_global: Vec<usize>,
}

impl Ownership {
    /// All-gather the per-rank partition vectors (collective).
    pub fn resolve<C: Communicator + ?Sized>(
        comm: &C,
        tag: CommTag,
        elmdist: &[usize],
        local_part: &[usize],
    ) -> Result<Self, MeshError> {
        check_elmdist(elmdist, comm.size())?;
        let gathered = all_gather_words(comm, tag, local_part)?;
        for (peer, part) in gathered.iter().enumerate() {
            let expected = elmdist[peer + 1] - elmdist[peer];
            if part.len() != expected {
                return Err(MeshError::CollectiveMismatch(format!(
                    "rank {peer} reported {} owners for {expected} cells",
                    part.len()
                )));
            }
        }
        Self::from_owners(comm.rank(), comm.size(), gathered.concat())
    }

    /// Derive counts and renumbering from a complete owner array.
    pub fn from_owners(rank: usize, nprocs: usize, cell_owner: Vec<usize>) -> Result<Self, MeshError> {
        let mut counts = vec![0usize; nprocs];
        for (cell, &owner) in cell_owner.iter().enumerate() {
            match counts.get_mut(owner) {
                Some(c) => *c += 1,
                None => {
                    return Err(MeshError::PartitionFailed(format!(
                        "cell {cell} assigned to rank {owner} of {nprocs}"
                    )));
                }
            }
        }
        let mut offsets = Vec::with_capacity(nprocs + 1);
        offsets.push(0);
        for &c in &counts {
            offsets.push(offsets[offsets.len() - 1] + c);
        }

        let mut next = offsets[..nprocs].to_vec();
        let mut metis_to_global = vec![0usize; cell_owner.len()];
        for (global, &owner) in cell_owner.iter().enumerate() {
            metis_to_global[next[owner]] = global;
            next[owner] += 1;
        }

        Ok(Self {
            rank,
            cell_owner,
            counts,
            offsets,
            metis_to_global,
        })
    }

    pub fn owner(&self, global_cell: usize) -> Result<usize, MeshError> {
        self.cell_owner
            .get(global_cell)
            .copied()
            .ok_or(MeshError::CellIndexOutOfRange {
                index: global_cell,
                len: self.cell_owner.len(),
            })
    }

    /// Cells owned by each rank.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn local_count(&self) -> usize {
        self.counts[self.rank]
    }

    /// Post-partition distribution, usable as `elmdist` for the dual-graph call.
    pub fn owned_distribution(&self) -> &[usize] {
        &self.offsets
    }

    /// This rank's metis-index range.
    pub fn own_range(&self) -> Range<usize> {
        self.offsets[self.rank]..self.offsets[self.rank + 1]
    }

    pub fn metis_to_global(&self, metis: usize) -> Result<usize, MeshError> {
        self.metis_to_global
            .get(metis)
            .copied()
            .ok_or(MeshError::CellIndexOutOfRange {
                index: metis,
                len: self.metis_to_global.len(),
            })
    }

    /// Global ids of this rank's cells, ascending.
    pub fn local_cells(&self) -> &[usize] {
        &self.metis_to_global[self.own_range()]
    }
}
