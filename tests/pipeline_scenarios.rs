mod util;

use mesh_halo::prelude::*;
use util::{check_local_invariants, prepare_on, prepare_with};

fn two_tets() -> GlobalMesh {
    GlobalMesh::from_sections(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ],
        vec![ElementSection::volume(
            "fluid",
            ElementKind::Tetrahedron,
            vec![vec![1, 2, 3, 4], vec![2, 3, 4, 5]],
        )],
    )
    .unwrap()
}

// unit hex at x in [0, 1] and a prism on its x = 1 face
fn hex_and_prism() -> GlobalMesh {
    GlobalMesh::from_sections(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
            [2.0, 0.0, 0.0],
            [2.0, 0.0, 1.0],
        ],
        vec![
            ElementSection::volume("hex", ElementKind::Hexahedron, vec![vec![1, 2, 3, 4, 5, 6, 7, 8]]),
            ElementSection::volume("prism", ElementKind::Prism, vec![vec![2, 9, 3, 6, 10, 7]]),
        ],
    )
    .unwrap()
}

#[test]
fn two_tets_share_one_internal_face() {
    let meshes = prepare_on(&two_tets(), 1);
    let mesh = &meshes[0];
    check_local_invariants(mesh);
    assert_eq!(mesh.faces.len(), 7);
    assert_eq!(mesh.internal_faces().count(), 1);
    assert_eq!(
        mesh.faces.iter().filter(|f| f.tag == BoundaryTag::Region(0)).count(),
        6
    );
    assert_eq!(mesh.internal_faces().next().unwrap().tag.to_raw(), -1);
}

#[test]
fn hex_pair_on_two_ranks_has_one_ghost_each() {
    let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
    let meshes = prepare_on(&global, 2);
    for (rank, mesh) in meshes.iter().enumerate() {
        check_local_invariants(mesh);
        assert_eq!(mesh.cells.len(), 1);
        assert_eq!(mesh.ghosts.len(), 1);
        assert_eq!(mesh.ghosts[0].owner, 1 - rank);
        assert_eq!(mesh.partition_faces().count(), 1);
        assert_eq!(mesh.boundary_faces().count(), 5);
        assert_eq!(mesh.internal_faces().count(), 0);

        let face = mesh.partition_faces().next().unwrap();
        assert_eq!(face.tag, BoundaryTag::PartitionGhost(0));
        assert_eq!(face.tag.to_raw(), -2);
        // the face points from the local cell towards the ghost
        let towards = mesh.ghosts[0].centroid[0] - mesh.cells[0].centroid[0];
        assert!(face.normal[0] * towards > 0.0);
    }
    assert_eq!(meshes[0].ghosts[0].global_id, meshes[1].cells[0].global_id);
    assert_eq!(meshes[1].ghosts[0].global_id, meshes[0].cells[0].global_id);
}

#[test]
fn unit_cube_of_six_tets_has_unit_volume() {
    let global = block(&BlockSpec::unit_cube([1, 1, 1], ElementKind::Tetrahedron)).unwrap();
    assert_eq!(global.cell_count(), 6);
    for np in [1, 2, 3, 6] {
        let meshes = prepare_on(&global, np);
        let volume: f64 = meshes.iter().map(|m| m.stats.total_volume).sum();
        assert!((volume - 1.0).abs() < 1e-10, "np = {np}: volume {volume}");
        meshes.iter().for_each(check_local_invariants);
    }
}

#[test]
fn counts_add_up_across_ranks() {
    let global = block(&BlockSpec::new([3, 2, 2], ElementKind::Prism)).unwrap();
    for np in [2, 3, 4] {
        let meshes = prepare_on(&global, np);
        let cells: usize = meshes.iter().map(|m| m.stats.cells).sum();
        let nodes: usize = meshes.iter().map(|m| m.stats.nodes).sum();
        assert_eq!(cells, global.cell_count());
        assert!(nodes >= global.node_count());

        // each partition face has a twin on the ghost's owner
        for mesh in &meshes {
            check_local_invariants(mesh);
            for ghost in &mesh.ghosts {
                let owner = &meshes[ghost.owner];
                let cell = owner.cell_global_to_local[&ghost.global_id];
                for (a, b) in owner.cells[cell].centroid.iter().zip(ghost.centroid) {
                    assert!((a - b).abs() < 1e-12);
                }
            }
        }
        let partition: usize = meshes.iter().map(|m| m.stats.partition_faces).sum();
        assert_eq!(partition % 2, 0);
        assert!(meshes.iter().all(|m| m.stats.edge_cut == meshes[0].stats.edge_cut));
    }
}

#[test]
fn single_rank_is_idempotent() {
    let global = block(&BlockSpec::new([2, 2, 2], ElementKind::Tetrahedron)).unwrap();
    let first = prepare_on(&global, 1);
    let second = prepare_on(&global, 1);
    let mesh = &first[0];
    assert_eq!(mesh.cells.len(), global.cell_count());
    assert!(mesh.ghosts.is_empty());
    assert!(mesh.faces.iter().all(|f| f.tag.ghost().is_none()));
    assert_eq!(mesh.faces, second[0].faces);
    assert_eq!(mesh.cells, second[0].cells);
}

#[test]
fn mixed_hex_and_prism() {
    let global = hex_and_prism();
    let serial = prepare_on(&global, 1);
    check_local_invariants(&serial[0]);
    assert_eq!(serial[0].faces.len(), 10);
    assert_eq!(serial[0].internal_faces().count(), 1);
    assert!((serial[0].stats.total_volume - 1.5).abs() < 1e-12);

    let split = prepare_on(&global, 2);
    for mesh in &split {
        check_local_invariants(mesh);
        assert_eq!(mesh.ghosts.len(), 1);
        assert_eq!(mesh.partition_faces().count(), 1);
    }
    let volume: f64 = split.iter().map(|m| m.stats.total_volume).sum();
    assert!((volume - 1.5).abs() < 1e-12);
}

#[test]
fn boundary_sections_tag_faces_and_nodes() {
    let global =
        block(&BlockSpec::new([2, 2, 2], ElementKind::Hexahedron).with_boundary_sections()).unwrap();
    let meshes = prepare_on(&global, 2);
    for section in global.boundary_sections() {
        let tagged: usize = meshes
            .iter()
            .map(|m| {
                m.boundary_faces()
                    .filter(|f| f.tag == BoundaryTag::Region(section.region))
                    .count()
            })
            .sum();
        assert_eq!(tagged, section.elements.len(), "{}", section.name);
    }
    // the origin is a corner on xmin, ymin and zmin
    let owner = meshes
        .iter()
        .find(|m| m.node_global_to_local.contains_key(&0))
        .unwrap();
    let origin = &owner.nodes[owner.node_global_to_local[&0]];
    let names: Vec<&str> = origin
        .boundary_regions
        .iter()
        .map(|&r| global.region_names()[r].as_str())
        .collect();
    assert_eq!(names, vec!["xmin", "ymin", "zmin"]);
}

#[test]
fn gradient_maps_only_use_faces_with_a_far_side() {
    let global = block(&BlockSpec::new([1, 1, 1], ElementKind::Hexahedron)).unwrap();
    let meshes = prepare_on(&global, 1);
    assert!(meshes[0].cells[0].grad_map.is_empty());

    let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Hexahedron)).unwrap();
    let meshes = prepare_on(&global, 2);
    for mesh in &meshes {
        let cell = &mesh.cells[0];
        assert!(cell.grad_map.contains_key(&Contributor::Ghost(0)));
        assert!(cell.grad_map.contains_key(&Contributor::Cell(0)));
    }
}

#[test]
fn warn_only_keeps_consistent_meshes_unchanged() {
    let global = block(&BlockSpec::new([2, 1, 1], ElementKind::Prism)).unwrap();
    let cfg = PartitionConfig {
        orientation: OrientationPolicy::WarnOnly,
        ..Default::default()
    };
    let corrected = prepare_on(&global, 2);
    let warned = prepare_with(&global, 2, &cfg);
    for (a, b) in corrected.iter().zip(&warned) {
        assert_eq!(a.faces, b.faces);
        assert_eq!(a.stats.flipped_faces, 0);
    }
}
