//! Mesh containers: the global source mesh and one rank's local submesh.

pub mod entities;
pub mod generate;
pub mod source;

pub use entities::{Cell, Face, Ghost, Node};
pub use source::{BoundarySection, ElementSection, GlobalMesh, MeshSource};

use crate::mesh_error::MeshError;
use crate::topology::tags::{BoundaryTag, Contributor};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Per-rank summary of the prepared submesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshStats {
    pub cells: usize,
    pub nodes: usize,
    pub faces: usize,
    pub boundary_faces: usize,
    pub partition_faces: usize,
    pub ghosts: usize,
    pub edge_cut: usize,
    pub total_volume: f64,
    pub flipped_faces: usize,
}

/// Everything one rank owns after mesh preparation.
///
/// Built once by the pipeline stages and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct LocalMesh {
    pub rank: usize,
    pub nprocs: usize,
    pub nodes: Vec<Node>,
    pub cells: Vec<Cell>,
    pub faces: Vec<Face>,
    pub ghosts: Vec<Ghost>,
    pub node_global_to_local: HashMap<usize, usize>,
    pub cell_global_to_local: HashMap<usize, usize>,
    pub ghost_global_to_local: HashMap<usize, usize>,
    pub stats: MeshStats,
}

impl LocalMesh {
    pub fn new(rank: usize, nprocs: usize) -> Self {
        Self {
            rank,
            nprocs,
            ..Default::default()
        }
    }

    /// Centroid of an interpolation contributor.
    pub fn contributor_centroid(&self, who: Contributor) -> Result<[f64; 3], MeshError> {
        match who {
            Contributor::Cell(c) => self
                .cells
                .get(c)
                .map(|cell| cell.centroid)
                .ok_or(MeshError::CellIndexOutOfRange {
                    index: c,
                    len: self.cells.len(),
                }),
            Contributor::Ghost(g) => self
                .ghosts
                .get(g)
                .map(|ghost| ghost.centroid)
                .ok_or(MeshError::CellIndexOutOfRange {
                    index: g,
                    len: self.ghosts.len(),
                }),
        }
    }

    pub fn internal_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|f| f.tag == BoundaryTag::Internal)
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|f| f.tag.is_external())
    }

    pub fn partition_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|f| f.tag.ghost().is_some())
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }

    /// Recompute the count fields of [`MeshStats`] from the current arrays.
    pub fn refresh_counts(&mut self) {
        self.stats.cells = self.cells.len();
        self.stats.nodes = self.nodes.len();
        self.stats.faces = self.faces.len();
        self.stats.boundary_faces = self.boundary_faces().count();
        self.stats.partition_faces = self.partition_faces().count();
        self.stats.ghosts = self.ghosts.len();
    }
}
