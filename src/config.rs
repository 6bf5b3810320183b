//! Partition pipeline configuration.
//!
//! Every field has a default matching the tuned values for tetrahedral-dominant
//! meshes, so an empty JSON object is a valid configuration.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do with a face whose area vector points into its parent cell.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationPolicy {
    /// Reverse the face's node order and flip its normal (logged at `warn`).
    #[default]
    Correct,
    /// Log at `warn` and keep the inward normal.
    WarnOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Nodes two cells must share to be adjacent for k-way partitioning.
    pub partition_common_nodes: usize,
    /// Nodes two cells must share to be adjacent in the halo dual graph.
    pub dual_common_nodes: usize,
    /// Allowed load imbalance, `max part / target part`.
    pub imbalance_tolerance: f64,
    /// Target fraction of cells per rank; uniform when absent.
    pub target_weights: Option<Vec<f64>>,
    /// Boundary refinement sweeps of the native partitioner.
    pub refinement_passes: usize,
    pub orientation: OrientationPolicy,
    /// Rank 0 writes the global connectivity here when set.
    pub connectivity_dump: Option<PathBuf>,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            partition_common_nodes: 3,
            dual_common_nodes: 1,
            imbalance_tolerance: 1.02,
            target_weights: None,
            refinement_passes: 4,
            orientation: OrientationPolicy::Correct,
            connectivity_dump: None,
        }
    }
}

impl PartitionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, MeshError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Target weights for `nprocs` ranks, uniform unless configured.
    pub fn weights(&self, nprocs: usize) -> Vec<f64> {
        match &self.target_weights {
            Some(w) => w.clone(),
            None => vec![1.0 / nprocs as f64; nprocs],
        }
    }

    /// Reject values that would make a later collective fail or hang.
    pub fn validate(&self, nprocs: usize) -> Result<(), MeshError> {
        if nprocs == 0 {
            return Err(MeshError::Config("process count must be at least 1".into()));
        }
        if self.partition_common_nodes == 0 || self.dual_common_nodes == 0 {
            return Err(MeshError::Config(
                "common-node thresholds must be at least 1".into(),
            ));
        }
        if !(self.imbalance_tolerance >= 1.0) {
            return Err(MeshError::Config(format!(
                "imbalance tolerance must be >= 1.0, got {}",
                self.imbalance_tolerance
            )));
        }
        if let Some(w) = &self.target_weights {
            if w.len() != nprocs {
                return Err(MeshError::Config(format!(
                    "{} target weights for {nprocs} processes",
                    w.len()
                )));
            }
            if w.iter().any(|&x| !(x > 0.0)) {
                return Err(MeshError::Config("target weights must be positive".into()));
            }
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(MeshError::Config(format!(
                    "target weights must sum to 1, got {sum}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg = PartitionConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, PartitionConfig::default());
        assert_eq!(cfg.weights(4), vec![0.25; 4]);
    }

    #[test]
    fn partial_json_overrides() {
        let cfg = PartitionConfig::from_json_str(
            r#"{ "orientation": "warn_only", "imbalance_tolerance": 1.1 }"#,
        )
        .unwrap();
        assert_eq!(cfg.orientation, OrientationPolicy::WarnOnly);
        assert_eq!(cfg.imbalance_tolerance, 1.1);
        assert_eq!(cfg.partition_common_nodes, 3);
    }

    #[test]
    fn validation() {
        let cfg = PartitionConfig {
            target_weights: Some(vec![0.5, 0.25]),
            ..Default::default()
        };
        assert!(cfg.validate(2).is_err());
        assert!(cfg.validate(3).is_err());
        assert!(PartitionConfig::default().validate(0).is_err());
        let cfg = PartitionConfig {
            imbalance_tolerance: 0.9,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(1), Err(MeshError::Config(_))));
    }
}
