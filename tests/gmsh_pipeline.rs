use mesh_halo::prelude::*;
use serial_test::serial;
use std::path::PathBuf;

// two unit hexes along x, inlet quad at x = 0 (physical 1), outlet at x = 2 (physical 2)
const TWO_HEX_MESH: &str = r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
12
1 0 0 0
2 1 0 0
3 2 0 0
4 0 1 0
5 1 1 0
6 2 1 0
7 0 0 1
8 1 0 1
9 2 0 1
10 0 1 1
11 1 1 1
12 2 1 1
$EndNodes
$Elements
4
1 3 2 1 1 1 4 10 7
2 3 2 2 2 3 9 12 6
3 5 2 10 10 1 2 5 4 7 8 11 10
4 5 2 10 10 2 3 6 5 8 9 12 11
$EndElements
"#;

fn write_mesh(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, TWO_HEX_MESH).expect("write mesh file");
    path
}

#[test]
#[serial]
fn gmsh_file_through_two_ranks() {
    let path = write_mesh("mesh_halo_two_hex.msh");
    let meshes = RayonComm::run(2, |comm| {
        prepare_local_mesh(
            &GmshFile::new(&path),
            comm,
            &NativePartitioner::default(),
            &PartitionConfig::default(),
        )
    })
    .unwrap();
    let meshes: Vec<LocalMesh> = meshes.into_iter().map(Result::unwrap).collect();

    let outlet_faces: usize = meshes
        .iter()
        .map(|m| m.faces.iter().filter(|f| f.tag == BoundaryTag::Region(1)).count())
        .sum();
    assert_eq!(outlet_faces, 1);
    for mesh in &meshes {
        assert_eq!(mesh.ghosts.len(), 1);
        assert!((mesh.stats.total_volume - 1.0).abs() < 1e-12);
    }
    // node 3 of the file (global 2) sits on the outlet
    let owner = meshes
        .iter()
        .find(|m| m.node_global_to_local.contains_key(&2))
        .unwrap();
    assert!(owner.nodes[owner.node_global_to_local[&2]].boundary_regions.contains(&1));
    std::fs::remove_file(&path).ok();
}

#[test]
#[serial]
fn missing_file_on_one_rank_fails_every_rank() {
    let path = write_mesh("mesh_halo_partial.msh");
    let results = RayonComm::run(3, |comm| {
        let source = if comm.rank() == 1 {
            GmshFile::new("/nonexistent/mesh_halo/missing.msh")
        } else {
            GmshFile::new(&path)
        };
        prepare_local_mesh(&source, comm, &NativePartitioner::default(), &PartitionConfig::default())
    })
    .unwrap();
    for result in results {
        match result {
            Err(MeshError::PreflightFailed { rank, reason }) => {
                assert_eq!(rank, 1);
                assert!(reason.contains("could not be found"), "{reason}");
            }
            other => panic!("expected pre-flight failure, got {other:?}"),
        }
    }
    std::fs::remove_file(&path).ok();
}

#[test]
fn ranks_with_different_meshes_are_rejected() {
    let small = block(&BlockSpec::new([1, 1, 1], ElementKind::Hexahedron)).unwrap();
    let large = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
    let results = RayonComm::run(2, |comm| {
        let source = if comm.rank() == 0 { &small } else { &large };
        prepare_local_mesh(source, comm, &NativePartitioner::default(), &PartitionConfig::default())
    })
    .unwrap();
    for result in results {
        assert!(matches!(result, Err(MeshError::CollectiveMismatch(_))));
    }
}

#[test]
fn target_weights_must_match_rank_count() {
    let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
    let cfg = PartitionConfig {
        target_weights: Some(vec![1.0]),
        ..Default::default()
    };
    let results = RayonComm::run(2, |comm| {
        prepare_local_mesh(&global, comm, &NativePartitioner::from_config(&cfg), &cfg)
    })
    .unwrap();
    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_collective_fatal());
        assert!(matches!(err, MeshError::PreflightFailed { rank: 0, .. }));
    }
}

#[test]
#[serial]
fn only_rank_zero_dumps_connectivity() {
    let global = block(&BlockSpec::new([3, 1, 1], ElementKind::Hexahedron)).unwrap();
    let dump = |rank: usize| std::env::temp_dir().join(format!("mesh_halo_conn_{rank}.txt"));
    for rank in 0..3 {
        std::fs::remove_file(dump(rank)).ok();
    }
    let results = RayonComm::run(3, |comm| {
        let cfg = PartitionConfig {
            connectivity_dump: Some(dump(comm.rank())),
            ..Default::default()
        };
        prepare_local_mesh(&global, comm, &NativePartitioner::from_config(&cfg), &cfg)
    })
    .unwrap();
    assert!(results.iter().all(Result::is_ok));

    let text = std::fs::read_to_string(dump(0)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), global.cell_count());
    for line in &lines {
        let ids: Vec<usize> = line.split('\t').map(|t| t.parse().unwrap()).collect();
        assert_eq!(ids.len(), 8);
        assert!(ids.iter().all(|&id| id >= 1 && id <= global.node_count()));
    }
    assert!(!dump(1).exists());
    assert!(!dump(2).exists());
    std::fs::remove_file(dump(0)).ok();
}

#[test]
fn unwritable_dump_path_still_completes_every_rank() {
    let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
    let cfg = PartitionConfig {
        connectivity_dump: Some("/nonexistent/mesh_halo/conn.txt".into()),
        ..Default::default()
    };
    let results = RayonComm::run(2, |comm| {
        prepare_local_mesh(&global, comm, &NativePartitioner::from_config(&cfg), &cfg)
    })
    .unwrap();
    for result in results {
        let mesh = result.unwrap();
        assert_eq!(mesh.ghosts.len(), 1);
    }
}
