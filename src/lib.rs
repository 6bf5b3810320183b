#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-halo
//!
//! mesh-halo prepares an unstructured 3-D mesh for a distributed
//! finite-volume solver. Every rank reads the same global mesh, takes part in
//! a k-way partitioning, and ends up with its own submesh: local nodes and
//! cells, deduplicated faces, ghost proxies for the cells just across the
//! partition boundary, and the geometric and interpolation data the flux
//! kernels read.
//!
//! ## Features
//! - Tetrahedral, prismatic and hexahedral cells, mixed freely
//! - Pluggable communication backends (serial, Rayon, MPI)
//! - Built-in k-way partitioner, or METIS behind `metis-support`
//! - ASCII Gmsh 2.2 input and structured block generators
//! - Boundary-condition regions carried onto faces and nodes
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-halo = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "metis-support"]
//! ```
//!
//! ```no_run
//! use mesh_halo::prelude::*;
//!
//! let global = block(&BlockSpec::unit_cube([4, 4, 4], ElementKind::Tetrahedron))?;
//! let config = PartitionConfig::from_json_str(r#"{ "refinement_passes": 8 }"#)?;
//! let partitioner = NativePartitioner::from_config(&config);
//! let meshes = RayonComm::run(4, |comm| {
//!     prepare_local_mesh(&global, comm, &partitioner, &config)
//! })?;
//! assert_eq!(meshes.len(), 4);
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Determinism
//!
//! Partitioning, face construction and ghost discovery only depend on the
//! global mesh and the rank count, so repeated runs produce identical local
//! meshes. Weight maps are ordered by [`Contributor`](topology::tags::Contributor).

pub mod algs;
pub mod config;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod pipeline;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    #[cfg(feature = "metis-support")]
    pub use crate::algs::partition::MetisPartitioner;
    pub use crate::algs::partition::{GraphPartitioner, NativePartitioner};
    pub use crate::config::{OrientationPolicy, PartitionConfig};
    pub use crate::io::gmsh::{GmshFile, GmshReader};
    pub use crate::mesh::generate::{BlockSpec, block};
    pub use crate::mesh::{
        Cell, ElementSection, Face, Ghost, GlobalMesh, LocalMesh, MeshSource, MeshStats, Node,
    };
    pub use crate::mesh_error::MeshError;
    pub use crate::pipeline::prepare_local_mesh;
    pub use crate::topology::cell_type::{ElementKind, SurfaceKind};
    pub use crate::topology::tags::{BoundaryTag, Contributor};
}
