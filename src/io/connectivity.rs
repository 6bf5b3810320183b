//! Plain-text dump of the global cell connectivity.
//!
//! One line per global cell, its 1-based node ids separated by tabs. Purely
//! diagnostic; nothing reads it back.

use crate::mesh::GlobalMesh;
use crate::mesh_error::MeshError;
use itertools::Itertools;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_connectivity<W: Write>(mesh: &GlobalMesh, mut out: W) -> Result<(), MeshError> {
    for cell in 0..mesh.cell_count() {
        let line = mesh.cell_nodes(cell)?.iter().map(|n| n + 1).join("\t");
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

pub fn dump_connectivity(mesh: &GlobalMesh, path: impl AsRef<Path>) -> Result<(), MeshError> {
    let file = std::fs::File::create(path.as_ref())?;
    write_connectivity(mesh, BufWriter::new(file))?;
    log::info!(
        "wrote connectivity of {} cells to {}",
        mesh.cell_count(),
        path.as_ref().display()
    );
    Ok(())
}
