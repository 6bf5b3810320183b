//! MeshError: Unified error type for mesh-halo public APIs
//!
//! Every stage of the partition pipeline reports failures through this type,
//! so callers can tell configuration problems from topological ones without
//! matching on strings.

use thiserror::Error;

/// Unified error type for mesh-halo operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Underlying I/O failure (message of the original `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(String),
    /// The mesh file named in the configuration does not exist.
    #[error("mesh file `{0}` could not be found")]
    MissingMeshFile(String),
    /// Malformed mesh input.
    #[error("mesh parse error: {0}")]
    MeshIoParse(String),
    /// An element kind outside {tetrahedron, prism, hexahedron} reached a
    /// volumetric dispatch point.
    #[error("unsupported element kind: {0}")]
    UnsupportedElementKind(String),
    /// Connectivity of a cell or boundary element is inconsistent with its kind.
    #[error("invalid connectivity: {0}")]
    InvalidConnectivity(String),
    /// A node index outside `0..len` was referenced.
    #[error("node index {index} out of range (node count {len})")]
    NodeIndexOutOfRange { index: usize, len: usize },
    /// A cell index outside `0..len` was referenced.
    #[error("cell index {index} out of range (cell count {len})")]
    CellIndexOutOfRange { index: usize, len: usize },
    /// The graph partitioning primitive failed. Fatal for the whole run.
    #[error("partitioning failed: {0}")]
    PartitionFailed(String),
    /// An element/cell distribution array is malformed.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    /// Point-to-point or collective communication failed.
    #[error("communication error with rank {neighbor}: {detail}")]
    CommError { neighbor: usize, detail: String },
    /// Ranks entered a collective with inconsistent global sizing.
    #[error("collective mismatch: {0}")]
    CollectiveMismatch(String),
    /// Some rank failed validation before the first collective call.
    #[error("pre-flight validation failed on rank {rank}: {reason}")]
    PreflightFailed { rank: usize, reason: String },
    /// A face or cell has zero area/volume, or a node coincides with a centroid.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for MeshError {
    fn from(err: std::io::Error) -> Self {
        MeshError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(err: serde_json::Error) -> Self {
        MeshError::Config(err.to_string())
    }
}

impl MeshError {
    /// True for failures that are fatal to every rank of the job.
    pub fn is_collective_fatal(&self) -> bool {
        matches!(
            self,
            MeshError::PartitionFailed(_)
                | MeshError::CommError { .. }
                | MeshError::CollectiveMismatch(_)
                | MeshError::PreflightFailed { .. }
        )
    }
}
