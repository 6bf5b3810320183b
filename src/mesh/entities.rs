//! Local mesh records: nodes, cells, faces and ghosts.
//!
//! Records reference each other by local index into the owning
//! [`LocalMesh`](crate::mesh::LocalMesh) arrays, never by pointer.

use crate::topology::cell_type::ElementKind;
use crate::topology::tags::{BoundaryTag, Contributor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub global_id: usize,
    pub coords: [f64; 3],
    /// Local cells using this node, ascending.
    pub cells: Vec<usize>,
    /// Ghosts touching this node.
    pub ghosts: BTreeSet<usize>,
    /// Boundary-condition regions of the external faces touching this node.
    pub boundary_regions: BTreeSet<usize>,
    /// Inverse-distance averaging weights; values sum to 1.
    pub average: BTreeMap<Contributor, f64>,
}

impl Node {
    pub fn new(id: usize, global_id: usize, coords: [f64; 3]) -> Self {
        Self {
            id,
            global_id,
            coords,
            cells: Vec::new(),
            ghosts: BTreeSet::new(),
            boundary_regions: BTreeSet::new(),
            average: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: usize,
    pub global_id: usize,
    pub kind: ElementKind,
    /// Local node ids in the element's canonical order.
    pub nodes: Vec<usize>,
    pub faces: Vec<usize>,
    pub centroid: [f64; 3],
    pub volume: f64,
    /// Smallest centroid-to-face height.
    pub length_scale: f64,
    /// Gradient-reconstruction weights: contributor -> weighted area vector / volume.
    pub grad_map: BTreeMap<Contributor, [f64; 3]>,
}

impl Cell {
    pub fn new(id: usize, global_id: usize, kind: ElementKind, nodes: Vec<usize>) -> Self {
        Self {
            id,
            global_id,
            kind,
            nodes,
            faces: Vec::with_capacity(kind.face_count()),
            centroid: [0.0; 3],
            volume: 0.0,
            length_scale: f64::INFINITY,
            grad_map: BTreeMap::new(),
        }
    }

    /// True when at least `threshold` of `face_nodes` belong to this cell.
    pub fn shares_nodes(&self, face_nodes: &[usize], threshold: usize) -> bool {
        face_nodes
            .iter()
            .filter(|&n| self.nodes.contains(n))
            .count()
            >= threshold
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: usize,
    /// Local node ids; the right-hand rule gives the outward normal of `parent`.
    pub nodes: Vec<usize>,
    pub parent: usize,
    pub neighbor: Option<usize>,
    pub tag: BoundaryTag,
    pub centroid: [f64; 3],
    pub area: f64,
    pub normal: [f64; 3],
    pub average: BTreeMap<Contributor, f64>,
}

impl Face {
    pub fn new(id: usize, nodes: Vec<usize>, parent: usize) -> Self {
        Self {
            id,
            nodes,
            parent,
            neighbor: None,
            tag: BoundaryTag::default(),
            centroid: [0.0; 3],
            area: 0.0,
            normal: [0.0; 3],
            average: BTreeMap::new(),
        }
    }

    /// Area vector `area * normal`, oriented away from `parent`.
    pub fn area_vector(&self) -> [f64; 3] {
        [
            self.normal[0] * self.area,
            self.normal[1] * self.area,
            self.normal[2] * self.area,
        ]
    }
}

/// Proxy for a cell owned by another rank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ghost {
    pub id: usize,
    pub global_id: usize,
    pub owner: usize,
    pub centroid: [f64; 3],
}
