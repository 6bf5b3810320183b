//! Mesh input and diagnostic output.

pub mod connectivity;
pub mod gmsh;

pub use gmsh::{GmshFile, GmshReader};
