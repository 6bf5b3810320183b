//! Gmsh `.msh` reader.
//!
//! # Supported format
//! - ASCII `.msh` version **2.2**.
//! - Volume elements: 4 (tet), 5 (hex), 6 (prism) become cells, in file order.
//! - Surface elements: 2 (triangle), 3 (quad) become boundary-condition
//!   elements; the first element tag (the physical group) selects the region.
//! - 1 (line) and 15 (point) are skipped and counted in the debug log.
//!
//! # Region numbering
//! Region ids are dense, not the physical tags themselves: the physical
//! groups present in the file are numbered in ascending tag order, each
//! named by [`physical_group_name`]. Use
//! [`GlobalMesh::region_id`] to go from a tag to its region.
//!
//! # Limitations
//! - Binary files and `.msh` v4.x are not supported.
//! - Higher-order elements and pyramids fail with `UnsupportedElementKind`.

use crate::mesh::source::{ElementSection, GlobalMesh, MeshSource};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::SectionKind;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Region name given to the surface elements of Gmsh physical group `tag`.
pub fn physical_group_name(tag: usize) -> String {
    format!("physical {tag}")
}

/// Gmsh `.msh` reader for ASCII v2.2 meshes.
#[derive(Debug, Default, Clone)]
pub struct GmshReader;

impl GmshReader {
    fn parse_version(line: &str) -> Result<&str, MeshError> {
        let mut parts = line.split_whitespace();
        let version = parts
            .next()
            .ok_or_else(|| MeshError::MeshIoParse("missing mesh format version".into()))?;
        let file_type = parts
            .next()
            .ok_or_else(|| MeshError::MeshIoParse("missing mesh format type".into()))?;
        if file_type != "0" {
            return Err(MeshError::MeshIoParse(
                "binary .msh files are not supported".into(),
            ));
        }
        if !version.starts_with('2') {
            return Err(MeshError::MeshIoParse(format!(
                "unsupported .msh version {version}"
            )));
        }
        Ok(version)
    }

    fn parse_usize(raw: Option<&str>, what: &str) -> Result<usize, MeshError> {
        let raw = raw.ok_or_else(|| MeshError::MeshIoParse(format!("missing {what}")))?;
        raw.parse::<usize>()
            .map_err(|_| MeshError::MeshIoParse(format!("invalid {what}: {raw}")))
    }

    fn parse_coord(raw: Option<&str>, axis: &str) -> Result<f64, MeshError> {
        let raw = raw.ok_or_else(|| MeshError::MeshIoParse(format!("missing {axis} coordinate")))?;
        raw.parse::<f64>()
            .map_err(|_| MeshError::MeshIoParse(format!("invalid coordinate: {raw}")))
    }

    fn expect_end<'a>(
        lines: &mut impl Iterator<Item = &'a str>,
        marker: &str,
    ) -> Result<(), MeshError> {
        match lines.next() {
            Some(line) if line.trim() == marker => Ok(()),
            _ => Err(MeshError::MeshIoParse(format!("missing {marker}"))),
        }
    }

    /// Parse mesh data from a reader.
    pub fn read<R: Read>(&self, mut reader: R) -> Result<GlobalMesh, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut lines = contents.lines();

        let mut version: Option<String> = None;
        // file node id -> dense 1-based id
        let mut node_ids: HashMap<usize, usize> = HashMap::new();
        let mut coords: Vec<[f64; 3]> = Vec::new();
        let mut volume_runs: Vec<ElementSection> = Vec::new();
        let mut boundary: BTreeMap<usize, Vec<ElementSection>> = BTreeMap::new();
        let mut skipped = 0usize;

        while let Some(line) = lines.next() {
            match line.trim() {
                "$MeshFormat" => {
                    let format_line = lines
                        .next()
                        .ok_or_else(|| MeshError::MeshIoParse("missing MeshFormat".into()))?;
                    version = Some(Self::parse_version(format_line)?.to_string());
                    Self::expect_end(&mut lines, "$EndMeshFormat")?;
                }
                "$Nodes" => {
                    let node_count = Self::parse_usize(lines.next().map(str::trim), "node count")?;
                    coords.reserve(node_count);
                    for _ in 0..node_count {
                        let node_line = lines.next().ok_or_else(|| {
                            MeshError::MeshIoParse("unexpected end of node list".into())
                        })?;
                        let mut parts = node_line.split_whitespace();
                        let id = Self::parse_usize(parts.next(), "node id")?;
                        let x = Self::parse_coord(parts.next(), "x")?;
                        let y = Self::parse_coord(parts.next(), "y")?;
                        let z = Self::parse_coord(parts.next(), "z")?;
                        coords.push([x, y, z]);
                        if node_ids.insert(id, coords.len()).is_some() {
                            return Err(MeshError::MeshIoParse(format!("duplicate node id {id}")));
                        }
                    }
                    Self::expect_end(&mut lines, "$EndNodes")?;
                }
                "$Elements" => {
                    let elem_count =
                        Self::parse_usize(lines.next().map(str::trim), "element count")?;
                    for _ in 0..elem_count {
                        let elem_line = lines.next().ok_or_else(|| {
                            MeshError::MeshIoParse("unexpected end of element list".into())
                        })?;
                        let mut parts = elem_line.split_whitespace();
                        let _elem_id = Self::parse_usize(parts.next(), "element id")?;
                        let elem_type = Self::parse_usize(parts.next(), "element type")? as u32;
                        let num_tags = Self::parse_usize(parts.next(), "element tag count")?;
                        let mut physical = 0;
                        for t in 0..num_tags {
                            let tag = Self::parse_usize(parts.next(), "element tag")?;
                            if t == 0 {
                                physical = tag;
                            }
                        }
                        let Some(kind) = SectionKind::from_gmsh(elem_type)? else {
                            skipped += 1;
                            continue;
                        };
                        let mut conn = Vec::with_capacity(kind.node_count());
                        for _ in 0..kind.node_count() {
                            let raw = Self::parse_usize(parts.next(), "element node id")?;
                            let dense = node_ids.get(&raw).copied().ok_or_else(|| {
                                MeshError::MeshIoParse(format!("element references unknown node {raw}"))
                            })?;
                            conn.push(dense);
                        }
                        match kind {
                            SectionKind::Volume(v) => {
                                let continues_run =
                                    volume_runs.last().is_some_and(|run| run.kind == kind);
                                if continues_run {
                                    if let Some(run) = volume_runs.last_mut() {
                                        run.elements.push(conn);
                                    }
                                } else {
                                    let name = format!("volume {}", volume_runs.len());
                                    volume_runs.push(ElementSection::volume(name, v, vec![conn]));
                                }
                            }
                            SectionKind::Surface(s) => {
                                let sections = boundary.entry(physical).or_default();
                                match sections.iter().position(|sec| sec.kind == kind) {
                                    Some(i) => sections[i].elements.push(conn),
                                    None => sections.push(ElementSection::surface(
                                        physical_group_name(physical),
                                        s,
                                        vec![conn],
                                    )),
                                }
                            }
                        }
                    }
                    Self::expect_end(&mut lines, "$EndElements")?;
                }
                _ => {
                    // ignore other sections
                }
            }
        }

        if version.is_none() {
            return Err(MeshError::MeshIoParse("missing $MeshFormat header".into()));
        }
        if volume_runs.is_empty() {
            return Err(MeshError::MeshIoParse("mesh contains no volume elements".into()));
        }
        log::debug!(
            "gmsh: {} nodes, {} volume runs, {} boundary groups, {skipped} line/point elements skipped",
            coords.len(),
            volume_runs.len(),
            boundary.len()
        );

        let mut sections = volume_runs;
        sections.extend(boundary.into_values().flatten());
        GlobalMesh::from_sections(coords, sections)
    }
}

/// A Gmsh file on disk, read on every [`MeshSource::load`].
#[derive(Debug, Clone)]
pub struct GmshFile {
    path: PathBuf,
}

impl GmshFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MeshSource for GmshFile {
    fn load(&self) -> Result<Cow<'_, GlobalMesh>, MeshError> {
        if !self.path.is_file() {
            return Err(MeshError::MissingMeshFile(self.path.display().to_string()));
        }
        log::info!("reading mesh file {}", self.path.display());
        let file = std::fs::File::open(&self.path)?;
        GmshReader
            .read(std::io::BufReader::new(file))
            .map(Cow::Owned)
    }
}
