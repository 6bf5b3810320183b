//! Structured block generators for hexahedral, tetrahedral and prismatic meshes.
//!
//! Blocks span `[0, extent]` with `dims[0] × dims[1] × dims[2]` hexahedral
//! slots. Tetrahedral blocks split every slot into six tetrahedra around the
//! slot's main diagonal; prismatic blocks split every slot into two prisms
//! across the bottom diagonal. Both splits are translation invariant, so the
//! faces of neighbouring slots always match.

use crate::mesh::source::{ElementSection, GlobalMesh};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::{ElementKind, SurfaceKind};
use itertools::Itertools;
use std::collections::HashMap;

/// Description of a structured block.
#[derive(Clone, Debug)]
pub struct BlockSpec {
    pub dims: [usize; 3],
    pub extent: [f64; 3],
    pub kind: ElementKind,
    /// Emit one boundary section per block side (xmin, xmax, ymin, ymax, zmin, zmax).
    pub boundary_sections: bool,
}

impl BlockSpec {
    pub fn new(dims: [usize; 3], kind: ElementKind) -> Self {
        Self {
            dims,
            extent: [dims[0] as f64, dims[1] as f64, dims[2] as f64],
            kind,
            boundary_sections: false,
        }
    }

    pub fn unit_cube(dims: [usize; 3], kind: ElementKind) -> Self {
        Self {
            extent: [1.0; 3],
            ..Self::new(dims, kind)
        }
    }

    pub fn with_boundary_sections(mut self) -> Self {
        self.boundary_sections = true;
        self
    }
}

const SIDE_NAMES: [&str; 6] = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];

const TET_SPLIT: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

const PRISM_SPLIT: [[usize; 6]; 2] = [[0, 1, 2, 4, 5, 6], [0, 2, 3, 4, 6, 7]];

/// Coordinates and 1-based sections of a block, before validation.
///
/// Useful when callers want to perturb coordinates before building the mesh.
pub fn block_sections(spec: &BlockSpec) -> Result<(Vec<[f64; 3]>, Vec<ElementSection>), MeshError> {
    let [nx, ny, nz] = spec.dims;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MeshError::Config(format!(
            "block dimensions must be non-zero, got {:?}",
            spec.dims
        )));
    }
    if spec.extent.iter().any(|&e| !(e > 0.0)) {
        return Err(MeshError::Config(format!(
            "block extent must be positive, got {:?}",
            spec.extent
        )));
    }

    let node_id = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let mut coords = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                coords.push([
                    spec.extent[0] * i as f64 / nx as f64,
                    spec.extent[1] * j as f64 / ny as f64,
                    spec.extent[2] * k as f64 / nz as f64,
                ]);
            }
        }
    }

    let mut cells: Vec<Vec<usize>> = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let slot = [
                    node_id(i, j, k),
                    node_id(i + 1, j, k),
                    node_id(i + 1, j + 1, k),
                    node_id(i, j + 1, k),
                    node_id(i, j, k + 1),
                    node_id(i + 1, j, k + 1),
                    node_id(i + 1, j + 1, k + 1),
                    node_id(i, j + 1, k + 1),
                ];
                match spec.kind {
                    ElementKind::Hexahedron => cells.push(slot.to_vec()),
                    ElementKind::Tetrahedron => {
                        cells.extend(TET_SPLIT.iter().map(|t| t.iter().map(|&l| slot[l]).collect()))
                    }
                    ElementKind::Prism => cells
                        .extend(PRISM_SPLIT.iter().map(|p| p.iter().map(|&l| slot[l]).collect())),
                }
            }
        }
    }

    let mut sections = Vec::new();
    if spec.boundary_sections {
        sections.extend(side_sections(spec, &coords, &cells));
    }
    let one_based = cells
        .into_iter()
        .map(|c| c.into_iter().map(|n| n + 1).collect())
        .collect();
    // volume section first so cell ids follow slot order
    sections.insert(0, ElementSection::volume("block", spec.kind, one_based));
    Ok((coords, sections))
}

/// Build a validated [`GlobalMesh`] for the block.
pub fn block(spec: &BlockSpec) -> Result<GlobalMesh, MeshError> {
    let (coords, sections) = block_sections(spec)?;
    GlobalMesh::from_sections(coords, sections)
}

/// Faces used by exactly one cell, grouped by the block side they lie on.
fn side_sections(spec: &BlockSpec, coords: &[[f64; 3]], cells: &[Vec<usize>]) -> Vec<ElementSection> {
    let mut uses: HashMap<Vec<usize>, (usize, Vec<usize>)> = HashMap::new();
    for cell in cells {
        for template in spec.kind.face_templates() {
            let face: Vec<usize> = template.iter().map(|&l| cell[l]).collect();
            let key: Vec<usize> = face.iter().copied().sorted().collect();
            uses.entry(key).or_insert((0, face)).0 += 1;
        }
    }

    let eps = 1e-12 * spec.extent.iter().cloned().fold(1.0, f64::max);
    let mut by_side: Vec<Vec<Vec<usize>>> = vec![Vec::new(); 6];
    for (_, (count, face)) in uses.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        if count != 1 {
            continue;
        }
        let side = (0..6).find(|&s| {
            let axis = s / 2;
            let plane = if s % 2 == 0 { 0.0 } else { spec.extent[axis] };
            face.iter().all(|&n| (coords[n][axis] - plane).abs() <= eps)
        });
        if let Some(s) = side {
            by_side[s].push(face.into_iter().map(|n| n + 1).collect());
        }
    }

    by_side
        .into_iter()
        .enumerate()
        .map(|(s, faces)| {
            let kind = match faces.first().map(Vec::len) {
                Some(3) => SurfaceKind::Triangle,
                _ => SurfaceKind::Quadrilateral,
            };
            ElementSection::surface(SIDE_NAMES[s], kind, faces)
        })
        .collect()
}
