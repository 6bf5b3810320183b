#![allow(dead_code)]

use mesh_halo::prelude::*;
use std::collections::HashSet;

/// Run the full pipeline on `np` simulated ranks and unwrap every rank's result.
pub fn prepare_on(global: &GlobalMesh, np: usize) -> Vec<LocalMesh> {
    prepare_with(global, np, &PartitionConfig::default())
}

pub fn prepare_with(global: &GlobalMesh, np: usize, cfg: &PartitionConfig) -> Vec<LocalMesh> {
    RayonComm::run(np, |comm| {
        prepare_local_mesh(global, comm, &NativePartitioner::from_config(cfg), cfg)
    })
    .expect("rayon world")
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("pipeline failed")
}

/// Structural invariants every prepared local mesh must satisfy.
pub fn check_local_invariants(mesh: &LocalMesh) {
    for cell in &mesh.cells {
        assert_eq!(cell.nodes.len(), cell.kind.node_count());
        assert_eq!(cell.faces.len(), cell.kind.face_count(), "cell {}", cell.global_id);
        assert!(cell.volume > 0.0);
    }

    let mut seen = HashSet::new();
    for face in &mesh.faces {
        let mut key = face.nodes.clone();
        key.sort_unstable();
        assert!(seen.insert(key), "face {} constructed twice", face.id);

        let users = mesh.cells.iter().filter(|c| c.faces.contains(&face.id)).count();
        match face.tag {
            BoundaryTag::Internal => {
                assert_eq!(users, 2);
                assert!(face.neighbor.is_some());
            }
            _ => {
                assert_eq!(users, 1);
                assert!(face.neighbor.is_none());
            }
        }
        if let BoundaryTag::PartitionGhost(g) = face.tag {
            assert!(g < mesh.ghosts.len());
            assert!(face.tag.to_raw() <= -2);
        }
    }

    for node in &mesh.nodes {
        let s: f64 = node.average.values().sum();
        assert!((s - 1.0).abs() < 1e-9, "node {} weights sum to {s}", node.global_id);
    }
}
