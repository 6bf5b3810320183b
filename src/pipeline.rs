//! End-to-end preparation of one rank's local mesh.
//!
//! Every rank calls [`prepare_local_mesh`] with the same source, partitioner
//! and configuration. The collectives are entered in a fixed order:
//!
//! 1. pre-flight status exchange,
//! 2. k-way partitioning of the striped initial distribution,
//! 3. ownership all-gather,
//! 4. dual-graph construction over the owned cells.
//!
//! Failures detected before step 1 are broadcast by step 1, so no rank is
//! left waiting in a later collective. Everything after step 4 is local.

use crate::algs::boundary::assign_boundary_regions;
use crate::algs::communicator::{Communicator, tags};
use crate::algs::faces::construct_faces;
use crate::algs::ghosts::GhostManager;
use crate::algs::local_mesh::{LocalMeshBuilder, owned_csr};
use crate::algs::ownership::{Ownership, initial_distribution};
use crate::algs::partition::{GraphPartitioner, KwayRequest};
use crate::algs::wire::{decode_words, encode_words};
use crate::config::PartitionConfig;
use crate::geometry::interpolation::build_weights;
use crate::geometry::metrics::GeometryCalculator;
use crate::io::connectivity::dump_connectivity;
use crate::mesh::{GlobalMesh, LocalMesh, MeshSource};
use crate::mesh_error::MeshError;
use std::borrow::Cow;

const STATUS_WORDS: usize = 3;

/// Exchange every rank's load/validation outcome and global sizes.
///
/// Each payload is `[ok, nodes, cells]` as wire words, followed by the
/// failure message when `ok == 0`.
fn preflight<'m, C: Communicator + ?Sized>(
    comm: &C,
    loaded: Result<Cow<'m, GlobalMesh>, MeshError>,
) -> Result<Cow<'m, GlobalMesh>, MeshError> {
    let mut payload = match &loaded {
        Ok(mesh) => encode_words(&[1, mesh.node_count(), mesh.cell_count()]),
        Err(_) => encode_words(&[0, 0, 0]),
    };
    if let Err(e) = &loaded {
        payload.extend_from_slice(e.to_string().as_bytes());
    }

    let gathered = comm.all_gather_bytes(tags::PREFLIGHT, &payload)?;
    let header_len = STATUS_WORDS * std::mem::size_of::<u64>();
    let mut statuses = Vec::with_capacity(gathered.len());
    for (peer, bytes) in gathered.iter().enumerate() {
        if bytes.len() < header_len {
            return Err(MeshError::CommError {
                neighbor: peer,
                detail: format!("pre-flight status of {} bytes", bytes.len()),
            });
        }
        let words = decode_words(&bytes[..header_len])?;
        statuses.push((words, &bytes[header_len..]));
    }

    if let Some((rank, (_, reason))) = statuses.iter().enumerate().find(|(_, (w, _))| w[0] == 0) {
        let reason = String::from_utf8_lossy(reason).into_owned();
        log::error!("rank {}: pre-flight failed on rank {rank}: {reason}", comm.rank());
        return Err(MeshError::PreflightFailed { rank, reason });
    }

    let mine = &statuses[comm.rank()].0;
    for (peer, (words, _)) in statuses.iter().enumerate() {
        if words[1..] != mine[1..] {
            return Err(MeshError::CollectiveMismatch(format!(
                "rank {peer} sees {} nodes / {} cells, rank {} sees {} / {}",
                words[1],
                words[2],
                comm.rank(),
                mine[1],
                mine[2]
            )));
        }
    }
    loaded
}

/// Partition the global mesh and build this rank's halo-complete local mesh.
pub fn prepare_local_mesh<S, C, P>(
    source: &S,
    comm: &C,
    partitioner: &P,
    config: &PartitionConfig,
) -> Result<LocalMesh, MeshError>
where
    S: MeshSource + ?Sized,
    C: Communicator + ?Sized,
    P: GraphPartitioner + ?Sized,
{
    let rank = comm.rank();
    let nprocs = comm.size();

    let loaded = config.validate(nprocs).and_then(|()| source.load());
    let global = preflight(comm, loaded)?;
    log::info!(
        "rank {rank}/{nprocs}: global mesh with {} nodes, {} cells",
        global.node_count(),
        global.cell_count()
    );

    // k-way partition of the striped distribution
    let elmdist = initial_distribution(global.cell_count(), nprocs)?;
    let (eptr, eind) = global.csr_slice(elmdist[rank]..elmdist[rank + 1])?;
    let tpwgts = config.weights(nprocs);
    let kway = partitioner.part_mesh_kway(
        comm,
        tags::PARTITION,
        &KwayRequest {
            elmdist: &elmdist,
            eptr: &eptr,
            eind: &eind,
            ncommon: config.partition_common_nodes,
            tpwgts: &tpwgts,
            ubvec: config.imbalance_tolerance,
        },
    )?;
    let ownership = Ownership::resolve(comm, tags::OWNERSHIP, &elmdist, &kway.part)?;
    log::info!(
        "rank {rank}: owns {} of {} cells, edge cut {}",
        ownership.local_count(),
        global.cell_count(),
        kway.edge_cut
    );

    let mut mesh = LocalMeshBuilder::new(&global, &ownership).build(rank, nprocs)?;
    // never fatal: the other ranks are already in the dual-graph collective
    if rank == 0 {
        if let Some(path) = &config.connectivity_dump {
            if let Err(e) = dump_connectivity(&global, path) {
                log::warn!("rank 0: skipping connectivity dump to {}: {e}", path.display());
            }
        }
    }

    let (own_ptr, own_ind) = owned_csr(&mesh);
    let dual = partitioner.mesh_to_dual(
        comm,
        tags::DUAL,
        ownership.owned_distribution(),
        &own_ptr,
        &own_ind,
        config.dual_common_nodes,
    )?;

    construct_faces(&mut mesh);
    if nprocs > 1 {
        GhostManager::new(&global, &ownership, &dual).discover(&mut mesh)?;
    }
    assign_boundary_regions(&mut mesh, global.boundary_sections());

    let flipped = GeometryCalculator::new(config.orientation).compute(&mut mesh)?;
    build_weights(&mut mesh)?;

    mesh.refresh_counts();
    mesh.stats.edge_cut = kway.edge_cut;
    mesh.stats.total_volume = mesh.total_volume();
    mesh.stats.flipped_faces = flipped;
    log::info!(
        "rank {rank}: {} cells, {} nodes, {} faces ({} boundary, {} partition), {} ghosts, volume {:.6e}",
        mesh.stats.cells,
        mesh.stats.nodes,
        mesh.stats.faces,
        mesh.stats.boundary_faces,
        mesh.stats.partition_faces,
        mesh.stats.ghosts,
        mesh.stats.total_volume
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::partition::NativePartitioner;
    use crate::mesh::generate::{BlockSpec, block};
    use crate::topology::cell_type::ElementKind;

    #[test]
    fn serial_run_has_no_partition_faces() {
        let global = block(&BlockSpec::unit_cube([2, 2, 2], ElementKind::Hexahedron)).unwrap();
        let mesh = prepare_local_mesh(
            &global,
            &NoComm,
            &NativePartitioner::default(),
            &PartitionConfig::default(),
        )
        .unwrap();
        assert_eq!(mesh.stats.cells, 8);
        assert_eq!(mesh.stats.nodes, 27);
        assert_eq!(mesh.stats.ghosts, 0);
        assert_eq!(mesh.stats.partition_faces, 0);
        assert_eq!(mesh.stats.boundary_faces, 24);
        assert_eq!(mesh.stats.edge_cut, 0);
        assert!((mesh.stats.total_volume - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_config_fails_before_partitioning() {
        let global = block(&BlockSpec::new([1, 1, 1], ElementKind::Hexahedron)).unwrap();
        let cfg = PartitionConfig {
            imbalance_tolerance: 0.5,
            ..Default::default()
        };
        let err = prepare_local_mesh(&global, &NoComm, &NativePartitioner::from_config(&cfg), &cfg)
            .unwrap_err();
        assert!(matches!(err, MeshError::PreflightFailed { rank: 0, .. }));
    }
}
