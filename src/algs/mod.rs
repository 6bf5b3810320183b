//! Partition-pipeline stages and the communication layer they run on.

pub mod boundary;
pub mod communicator;
pub mod dual_graph;
pub mod faces;
pub mod ghosts;
pub mod local_mesh;
pub mod ownership;
pub mod partition;
pub mod wire;

pub use communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
pub use dual_graph::DualGraph;
pub use ghosts::GhostManager;
pub use local_mesh::LocalMeshBuilder;
pub use ownership::Ownership;
#[cfg(feature = "metis-support")]
pub use partition::MetisPartitioner;
pub use partition::{GraphPartitioner, NativePartitioner};
