//! Element kind metadata for mesh cells and boundary elements.
//!
//! Volumetric cells are a closed set: tetrahedra, prisms and hexahedra. Their
//! node ordering follows the CGNS/Gmsh convention (bottom ring counter-clockwise
//! seen from above, then the top ring), and every face template below lists its
//! nodes so that the right-hand rule yields an outward normal on a
//! positively-oriented element.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};

/// Volumetric element kinds understood by the partition pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    /// 4 nodes, 4 triangular faces.
    Tetrahedron,
    /// 6 nodes, 2 triangular + 3 quadrilateral faces.
    Prism,
    /// 8 nodes, 6 quadrilateral faces.
    Hexahedron,
}

/// Surface element kinds; these only ever describe boundary-condition sections.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Triangle,
    Quadrilateral,
}

/// Any element kind that can appear in a mesh section.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum SectionKind {
    Volume(ElementKind),
    Surface(SurfaceKind),
}

const TET_FACE_0: [usize; 3] = [0, 2, 1];
const TET_FACE_1: [usize; 3] = [1, 2, 3];
const TET_FACE_2: [usize; 3] = [0, 3, 2];
const TET_FACE_3: [usize; 3] = [0, 1, 3];
const PRISM_FACE_0: [usize; 3] = [0, 2, 1];
const PRISM_FACE_1: [usize; 3] = [3, 4, 5];
const PRISM_FACE_2: [usize; 4] = [0, 3, 5, 2];
const PRISM_FACE_3: [usize; 4] = [1, 2, 5, 4];
const PRISM_FACE_4: [usize; 4] = [0, 1, 4, 3];
const HEX_FACE_0: [usize; 4] = [0, 3, 2, 1];
const HEX_FACE_1: [usize; 4] = [4, 5, 6, 7];
const HEX_FACE_2: [usize; 4] = [1, 2, 6, 5];
const HEX_FACE_3: [usize; 4] = [0, 4, 7, 3];
const HEX_FACE_4: [usize; 4] = [1, 5, 4, 0];
const HEX_FACE_5: [usize; 4] = [2, 3, 7, 6];

const TET_FACES: [&[usize]; 4] = [&TET_FACE_0, &TET_FACE_1, &TET_FACE_2, &TET_FACE_3];
const PRISM_FACES: [&[usize]; 5] = [
    &PRISM_FACE_0,
    &PRISM_FACE_1,
    &PRISM_FACE_2,
    &PRISM_FACE_3,
    &PRISM_FACE_4,
];
const HEX_FACES: [&[usize]; 6] = [
    &HEX_FACE_0,
    &HEX_FACE_1,
    &HEX_FACE_2,
    &HEX_FACE_3,
    &HEX_FACE_4,
    &HEX_FACE_5,
];

impl ElementKind {
    /// Number of nodes of this element kind.
    pub const fn node_count(self) -> usize {
        match self {
            ElementKind::Tetrahedron => 4,
            ElementKind::Prism => 6,
            ElementKind::Hexahedron => 8,
        }
    }

    /// Number of faces of this element kind.
    pub const fn face_count(self) -> usize {
        match self {
            ElementKind::Tetrahedron => 4,
            ElementKind::Prism => 5,
            ElementKind::Hexahedron => 6,
        }
    }

    /// Face-to-local-node templates, one slice per face, outward winding.
    pub fn face_templates(self) -> &'static [&'static [usize]] {
        match self {
            ElementKind::Tetrahedron => &TET_FACES,
            ElementKind::Prism => &PRISM_FACES,
            ElementKind::Hexahedron => &HEX_FACES,
        }
    }

    /// Resolve a volumetric kind from a Gmsh element type code.
    pub fn from_gmsh(code: u32) -> Result<Self, MeshError> {
        match SectionKind::from_gmsh(code)? {
            Some(SectionKind::Volume(kind)) => Ok(kind),
            _ => Err(MeshError::UnsupportedElementKind(format!(
                "gmsh type {code} is not volumetric"
            ))),
        }
    }
}

impl SurfaceKind {
    pub const fn node_count(self) -> usize {
        match self {
            SurfaceKind::Triangle => 3,
            SurfaceKind::Quadrilateral => 4,
        }
    }
}

impl SectionKind {
    pub const fn node_count(self) -> usize {
        match self {
            SectionKind::Volume(kind) => kind.node_count(),
            SectionKind::Surface(kind) => kind.node_count(),
        }
    }

    /// Map a Gmsh element type to a section kind.
    ///
    /// Points (15) and lines (1) carry no cell or face information and map to
    /// `None`; every other unknown type is an error.
    pub fn from_gmsh(code: u32) -> Result<Option<Self>, MeshError> {
        match code {
            1 | 15 => Ok(None),
            2 => Ok(Some(SectionKind::Surface(SurfaceKind::Triangle))),
            3 => Ok(Some(SectionKind::Surface(SurfaceKind::Quadrilateral))),
            4 => Ok(Some(SectionKind::Volume(ElementKind::Tetrahedron))),
            5 => Ok(Some(SectionKind::Volume(ElementKind::Hexahedron))),
            6 => Ok(Some(SectionKind::Volume(ElementKind::Prism))),
            other => Err(MeshError::UnsupportedElementKind(format!(
                "gmsh element type {other}"
            ))),
        }
    }
}
