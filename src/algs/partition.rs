//! Distributed k-way mesh partitioning and dual-graph construction.
//!
//! Both entry points follow the ParMETIS mesh interface: cells are spread
//! over ranks by an `elmdist` array of length `nprocs + 1`, rank `r` owning
//! the global cells `elmdist[r]..elmdist[r + 1]` and passing their
//! connectivity as a CSR pair of global node ids. Both calls are collective.
//!
//! [`NativePartitioner`] gathers the distributed CSR on every rank, grows
//! parts breadth-first over the dual graph and refines the boundary
//! greedily. [`MetisPartitioner`] (feature `metis-support`) hands the same
//! gathered graph to METIS.

use crate::algs::communicator::{CommTag, Communicator, all_gather_words};
use crate::algs::dual_graph::{DualGraph, check_csr};
use crate::config::PartitionConfig;
use crate::mesh_error::MeshError;
use std::collections::{BTreeMap, VecDeque};

/// Inputs of a k-way partitioning call, as seen from one rank.
#[derive(Clone, Copy, Debug)]
pub struct KwayRequest<'a> {
    pub elmdist: &'a [usize],
    pub eptr: &'a [usize],
    pub eind: &'a [usize],
    /// Nodes two cells must share to be adjacent.
    pub ncommon: usize,
    /// Target fraction of cells per part, one entry per rank.
    pub tpwgts: &'a [f64],
    /// Allowed imbalance, `max part / target part`.
    pub ubvec: f64,
}

/// This rank's share of a k-way result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KwayResult {
    /// Destination rank of each local cell.
    pub part: Vec<usize>,
    /// Global edge cut of the whole assignment.
    pub edge_cut: usize,
}

pub trait GraphPartitioner {
    /// Assign every local cell a destination rank.
    fn part_mesh_kway<C: Communicator + ?Sized>(
        &self,
        comm: &C,
        tag: CommTag,
        req: &KwayRequest<'_>,
    ) -> Result<KwayResult, MeshError>;

    /// This rank's rows of the dual graph, with neighbours numbered by their
    /// position in the `elmdist` distribution (the "metis index").
    fn mesh_to_dual<C: Communicator + ?Sized>(
        &self,
        comm: &C,
        tag: CommTag,
        elmdist: &[usize],
        eptr: &[usize],
        eind: &[usize],
        ncommon: usize,
    ) -> Result<DualGraph, MeshError> {
        let (geptr, geind) = gather_distributed_csr(comm, tag, elmdist, eptr, eind)?;
        let graph = DualGraph::from_elements(&geptr, &geind, ncommon)?;
        let rank = comm.rank();
        graph.rows(elmdist[rank]..elmdist[rank + 1])
    }
}

/// Check that `elmdist` is a monotone distribution over `nprocs` ranks.
pub fn check_elmdist(elmdist: &[usize], nprocs: usize) -> Result<(), MeshError> {
    if elmdist.len() != nprocs + 1 {
        return Err(MeshError::InvalidDistribution(format!(
            "distribution has {} entries for {nprocs} ranks",
            elmdist.len()
        )));
    }
    if elmdist[0] != 0 || elmdist.windows(2).any(|w| w[0] > w[1]) {
        return Err(MeshError::InvalidDistribution(format!(
            "distribution {elmdist:?} is not monotone from 0"
        )));
    }
    Ok(())
}

/// Gather every rank's CSR slice into the full cell list, in distribution order.
pub fn gather_distributed_csr<C: Communicator + ?Sized>(
    comm: &C,
    tag: CommTag,
    elmdist: &[usize],
    eptr: &[usize],
    eind: &[usize],
) -> Result<(Vec<usize>, Vec<usize>), MeshError> {
    let rank = comm.rank();
    check_elmdist(elmdist, comm.size())?;
    check_csr(eptr, eind)?;
    let local_cells = eptr.len() - 1;
    let expected = elmdist[rank + 1] - elmdist[rank];
    if local_cells != expected {
        return Err(MeshError::InvalidDistribution(format!(
            "rank {rank} holds {local_cells} cells, distribution says {expected}"
        )));
    }

    let lens: Vec<usize> = eptr.windows(2).map(|w| w[1] - w[0]).collect();
    let all_lens = all_gather_words(comm, tag, &lens)?;
    let all_ind = all_gather_words(comm, tag.offset(2), eind)?;

    let total = elmdist[comm.size()];
    let mut geptr = Vec::with_capacity(total + 1);
    let mut geind = Vec::with_capacity(all_ind.iter().map(Vec::len).sum());
    geptr.push(0);
    for (peer, (peer_lens, peer_ind)) in all_lens.iter().zip(&all_ind).enumerate() {
        let span: usize = peer_lens.iter().sum();
        if peer_lens.len() != elmdist[peer + 1] - elmdist[peer] || span != peer_ind.len() {
            return Err(MeshError::CollectiveMismatch(format!(
                "rank {peer} sent {} cells with {} indices",
                peer_lens.len(),
                peer_ind.len()
            )));
        }
        for &len in peer_lens {
            geptr.push(geptr[geptr.len() - 1] + len);
        }
        geind.extend_from_slice(peer_ind);
    }
    Ok((geptr, geind))
}

fn check_weights(tpwgts: &[f64], nparts: usize, ubvec: f64) -> Result<(), MeshError> {
    if tpwgts.len() != nparts {
        return Err(MeshError::PartitionFailed(format!(
            "{} target weights for {nparts} parts",
            tpwgts.len()
        )));
    }
    if !(ubvec >= 1.0) {
        return Err(MeshError::PartitionFailed(format!(
            "imbalance tolerance {ubvec} below 1"
        )));
    }
    Ok(())
}

/// Part sizes for `n` vertices: cumulative rounding of the target weights,
/// so the sizes always add up to `n` and the last part absorbs any rounding.
pub fn target_sizes(n: usize, tpwgts: &[f64]) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(tpwgts.len());
    let mut acc = 0.0;
    let mut prev = 0usize;
    for (p, w) in tpwgts.iter().enumerate() {
        acc += w;
        let bound = if p + 1 == tpwgts.len() {
            n
        } else {
            ((n as f64 * acc).round() as usize).clamp(prev, n)
        };
        sizes.push(bound - prev);
        prev = bound;
    }
    sizes
}

/// Built-in k-way partitioner.
#[derive(Clone, Debug)]
pub struct NativePartitioner {
    pub refinement_passes: usize,
}

impl Default for NativePartitioner {
    fn default() -> Self {
        Self {
            refinement_passes: 4,
        }
    }
}

impl NativePartitioner {
    pub fn new(refinement_passes: usize) -> Self {
        Self { refinement_passes }
    }

    pub fn from_config(config: &PartitionConfig) -> Self {
        Self::new(config.refinement_passes)
    }

    /// Serial k-way assignment of every vertex of `graph`.
    pub fn partition_graph(&self, graph: &DualGraph, tpwgts: &[f64], ubvec: f64) -> Vec<usize> {
        let n = graph.vertex_count();
        let nparts = tpwgts.len().max(1);
        let targets = target_sizes(n, tpwgts);
        let mut part = grow_parts(graph, &targets);
        let max_sizes: Vec<usize> = targets
            .iter()
            .map(|&t| ((t as f64 * ubvec).ceil() as usize).max(t))
            .collect();
        let mut sizes = vec![0usize; nparts];
        for &p in &part {
            sizes[p] += 1;
        }
        for pass in 0..self.refinement_passes {
            let moved = refine_boundary(graph, &mut part, &mut sizes, &max_sizes);
            log::trace!("refinement pass {pass}: {moved} moves");
            if moved == 0 {
                break;
            }
        }
        part
    }
}

/// Breadth-first growth: part `p` takes `targets[p]` vertices reachable from
/// the lowest unassigned vertex, reseeding whenever the frontier empties.
fn grow_parts(graph: &DualGraph, targets: &[usize]) -> Vec<usize> {
    let n = graph.vertex_count();
    let last = targets.len().saturating_sub(1);
    let mut part = vec![last; n];
    let mut assigned = vec![false; n];
    let mut cursor = 0;
    for (p, &target) in targets.iter().enumerate().take(last) {
        let mut taken = 0;
        let mut frontier = VecDeque::new();
        while taken < target {
            let v = match frontier.pop_front() {
                Some(v) => v,
                None => {
                    while cursor < n && assigned[cursor] {
                        cursor += 1;
                    }
                    if cursor == n {
                        break;
                    }
                    cursor
                }
            };
            if assigned[v] {
                continue;
            }
            assigned[v] = true;
            part[v] = p;
            taken += 1;
            frontier.extend(graph.neighbors(v).iter().copied().filter(|&u| !assigned[u]));
        }
    }
    part
}

/// One greedy sweep moving boundary vertices to the neighbouring part they
/// are most connected to, when that strictly reduces the cut and keeps both
/// parts within bounds. Returns the number of moves.
fn refine_boundary(
    graph: &DualGraph,
    part: &mut [usize],
    sizes: &mut [usize],
    max_sizes: &[usize],
) -> usize {
    let mut moved = 0;
    for v in 0..graph.vertex_count() {
        let from = part[v];
        if sizes[from] <= 1 {
            continue;
        }
        let mut links: BTreeMap<usize, usize> = BTreeMap::new();
        for &u in graph.neighbors(v) {
            *links.entry(part[u]).or_default() += 1;
        }
        let internal = links.get(&from).copied().unwrap_or(0);
        let best = links
            .iter()
            .filter(|&(&q, &w)| q != from && w > internal && sizes[q] < max_sizes[q])
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)));
        if let Some((&to, _)) = best {
            part[v] = to;
            sizes[from] -= 1;
            sizes[to] += 1;
            moved += 1;
        }
    }
    moved
}

impl GraphPartitioner for NativePartitioner {
    fn part_mesh_kway<C: Communicator + ?Sized>(
        &self,
        comm: &C,
        tag: CommTag,
        req: &KwayRequest<'_>,
    ) -> Result<KwayResult, MeshError> {
        let nparts = comm.size();
        check_weights(req.tpwgts, nparts, req.ubvec)?;
        let (geptr, geind) = gather_distributed_csr(comm, tag, req.elmdist, req.eptr, req.eind)?;
        let graph = DualGraph::from_elements(&geptr, &geind, req.ncommon)?;
        let part = self.partition_graph(&graph, req.tpwgts, req.ubvec);
        let edge_cut = graph.edge_cut(&part);
        let rank = comm.rank();
        Ok(KwayResult {
            part: part[req.elmdist[rank]..req.elmdist[rank + 1]].to_vec(),
            edge_cut,
        })
    }
}

/// METIS k-way partitioner over the gathered dual graph.
#[cfg(feature = "metis-support")]
#[derive(Clone, Debug, Default)]
pub struct MetisPartitioner;

#[cfg(feature = "metis-support")]
impl GraphPartitioner for MetisPartitioner {
    fn part_mesh_kway<C: Communicator + ?Sized>(
        &self,
        comm: &C,
        tag: CommTag,
        req: &KwayRequest<'_>,
    ) -> Result<KwayResult, MeshError> {
        use metis::{Graph, Idx, Real};

        let nparts = comm.size();
        check_weights(req.tpwgts, nparts, req.ubvec)?;
        let (geptr, geind) = gather_distributed_csr(comm, tag, req.elmdist, req.eptr, req.eind)?;
        let graph = DualGraph::from_elements(&geptr, &geind, req.ncommon)?;
        let n = graph.vertex_count();

        let part: Vec<usize> = if nparts == 1 || n == 0 {
            vec![0; n]
        } else {
            let to_idx = |v: usize| {
                Idx::try_from(v).map_err(|_| {
                    MeshError::PartitionFailed(format!("index {v} exceeds METIS range"))
                })
            };
            let xadj = graph.xadj.iter().map(|&v| to_idx(v)).collect::<Result<Vec<_>, _>>()?;
            let adjncy = graph
                .adjncy
                .iter()
                .map(|&v| to_idx(v))
                .collect::<Result<Vec<_>, _>>()?;
            let tpwgts: Vec<Real> = req.tpwgts.iter().map(|&w| w as Real).collect();
            let ubvec = [req.ubvec as Real];
            let mut part = vec![0 as Idx; n];
            Graph::new(1, to_idx(nparts)?, &xadj, &adjncy)
                .map_err(|e| MeshError::PartitionFailed(e.to_string()))?
                .set_tpwgts(&tpwgts)
                .set_ubvec(&ubvec)
                .part_kway(&mut part)
                .map_err(|e| MeshError::PartitionFailed(e.to_string()))?;
            part.into_iter().map(|p| p as usize).collect()
        };

        let edge_cut = graph.edge_cut(&part);
        let rank = comm.rank();
        Ok(KwayResult {
            part: part[req.elmdist[rank]..req.elmdist[rank + 1]].to_vec(),
            edge_cut,
        })
    }
}
