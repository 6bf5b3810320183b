//! The global, unpartitioned mesh every rank reads before partitioning.
//!
//! Input arrives as element sections with 1-based node lists, the shape most
//! scientific mesh formats expose. Volume sections become cells (in section
//! order, so global cell ids are contiguous per section); triangle and quad
//! sections become boundary-condition sections. Boundary regions are numbered
//! by first appearance of the section name, so a triangle and a quad section
//! with the same name share one region.

use crate::mesh_error::MeshError;
use crate::topology::cell_type::{ElementKind, SectionKind, SurfaceKind};
use std::borrow::Cow;

/// One element section as read from a mesh file (node ids are 1-based).
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSection {
    pub name: String,
    pub kind: SectionKind,
    /// Per-element node lists, each of `kind.node_count()` entries.
    pub elements: Vec<Vec<usize>>,
}

impl ElementSection {
    pub fn volume(name: impl Into<String>, kind: ElementKind, elements: Vec<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            kind: SectionKind::Volume(kind),
            elements,
        }
    }

    pub fn surface(name: impl Into<String>, kind: SurfaceKind, elements: Vec<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            kind: SectionKind::Surface(kind),
            elements,
        }
    }
}

/// Boundary-condition elements of one region, with 0-based node ids.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundarySection {
    pub name: String,
    pub region: usize,
    pub kind: SurfaceKind,
    pub elements: Vec<Vec<usize>>,
}

/// Global node coordinates plus cell connectivity in CSR form (0-based).
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalMesh {
    coords: Vec<[f64; 3]>,
    kinds: Vec<ElementKind>,
    conn_offsets: Vec<usize>,
    conn: Vec<usize>,
    boundary: Vec<BoundarySection>,
    region_names: Vec<String>,
}

impl GlobalMesh {
    /// Build from coordinates and 1-based element sections.
    pub fn from_sections(
        coords: Vec<[f64; 3]>,
        sections: Vec<ElementSection>,
    ) -> Result<Self, MeshError> {
        let node_count = coords.len();
        let mut mesh = GlobalMesh {
            coords,
            kinds: Vec::new(),
            conn_offsets: vec![0],
            conn: Vec::new(),
            boundary: Vec::new(),
            region_names: Vec::new(),
        };
        for section in sections {
            let expected = section.kind.node_count();
            let mut zero_based = Vec::with_capacity(section.elements.len());
            for (e, element) in section.elements.iter().enumerate() {
                if element.len() != expected {
                    return Err(MeshError::InvalidConnectivity(format!(
                        "section `{}` element {e}: expected {expected} nodes, got {}",
                        section.name,
                        element.len()
                    )));
                }
                let nodes = element
                    .iter()
                    .map(|&n| {
                        if n == 0 || n > node_count {
                            Err(MeshError::NodeIndexOutOfRange {
                                index: n,
                                len: node_count,
                            })
                        } else {
                            Ok(n - 1)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                zero_based.push(nodes);
            }
            match section.kind {
                SectionKind::Volume(kind) => {
                    for nodes in zero_based {
                        mesh.kinds.push(kind);
                        mesh.conn.extend(nodes);
                        mesh.conn_offsets.push(mesh.conn.len());
                    }
                }
                SectionKind::Surface(kind) => {
                    let region = match mesh.region_id(&section.name) {
                        Some(r) => r,
                        None => {
                            mesh.region_names.push(section.name.clone());
                            mesh.region_names.len() - 1
                        }
                    };
                    mesh.boundary.push(BoundarySection {
                        name: section.name,
                        region,
                        kind,
                        elements: zero_based,
                    });
                }
            }
        }
        Ok(mesh)
    }

    pub fn node_count(&self) -> usize {
        self.coords.len()
    }

    pub fn cell_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn coords(&self) -> &[[f64; 3]] {
        &self.coords
    }

    /// Coordinates of global node `node`.
    pub fn node(&self, node: usize) -> Result<[f64; 3], MeshError> {
        self.coords
            .get(node)
            .copied()
            .ok_or(MeshError::NodeIndexOutOfRange {
                index: node,
                len: self.coords.len(),
            })
    }

    pub fn cell_kind(&self, cell: usize) -> Result<ElementKind, MeshError> {
        self.kinds
            .get(cell)
            .copied()
            .ok_or(MeshError::CellIndexOutOfRange {
                index: cell,
                len: self.kinds.len(),
            })
    }

    /// Global node ids of global cell `cell`, in canonical element order.
    pub fn cell_nodes(&self, cell: usize) -> Result<&[usize], MeshError> {
        if cell >= self.kinds.len() {
            return Err(MeshError::CellIndexOutOfRange {
                index: cell,
                len: self.kinds.len(),
            });
        }
        Ok(&self.conn[self.conn_offsets[cell]..self.conn_offsets[cell + 1]])
    }

    /// Centroid of a global cell, the mean of its node coordinates.
    pub fn cell_centroid(&self, cell: usize) -> Result<[f64; 3], MeshError> {
        let nodes = self.cell_nodes(cell)?;
        let mut c = [0.0; 3];
        for &n in nodes {
            let p = self.node(n)?;
            c[0] += p[0];
            c[1] += p[1];
            c[2] += p[2];
        }
        let k = nodes.len() as f64;
        Ok([c[0] / k, c[1] / k, c[2] / k])
    }

    /// CSR slice `(eptr, eind)` for global cells `range`, offsets rebased to 0.
    pub fn csr_slice(&self, range: std::ops::Range<usize>) -> Result<(Vec<usize>, Vec<usize>), MeshError> {
        if range.end > self.kinds.len() || range.start > range.end {
            return Err(MeshError::CellIndexOutOfRange {
                index: range.end,
                len: self.kinds.len(),
            });
        }
        let base = self.conn_offsets[range.start];
        let eptr = self.conn_offsets[range.start..=range.end]
            .iter()
            .map(|&o| o - base)
            .collect();
        let eind = self.conn[base..self.conn_offsets[range.end]].to_vec();
        Ok((eptr, eind))
    }

    pub fn boundary_sections(&self) -> &[BoundarySection] {
        &self.boundary
    }

    /// Boundary region names, indexed by region id.
    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    /// Region id of the boundary sections named `name`.
    pub fn region_id(&self, name: &str) -> Option<usize> {
        self.region_names.iter().position(|n| n == name)
    }
}

/// Anything that can produce the global mesh. Read once per run.
pub trait MeshSource {
    fn load(&self) -> Result<Cow<'_, GlobalMesh>, MeshError>;
}

impl MeshSource for GlobalMesh {
    fn load(&self) -> Result<Cow<'_, GlobalMesh>, MeshError> {
        Ok(Cow::Borrowed(self))
    }
}
