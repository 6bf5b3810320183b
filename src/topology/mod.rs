//! Element kinds, face templates and face classification.

pub mod cell_type;
pub mod tags;

pub use cell_type::{ElementKind, SectionKind, SurfaceKind};
pub use tags::{BoundaryTag, Contributor};
