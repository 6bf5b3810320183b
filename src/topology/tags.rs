//! Face classification and interpolation contributor ids.
//!
//! A face is either on an external boundary region, internal to the local
//! partition, or on a partition boundary where the opposite cell is a ghost.
//! Downstream code that still wants the compact integer form can use
//! [`BoundaryTag::to_raw`] / [`BoundaryTag::from_raw`]:
//! `>= 0` region, `-1` internal, `<= -2` ghost `-(raw) - 2`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a face.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum BoundaryTag {
    /// External boundary face in boundary-condition region `id`.
    Region(usize),
    /// Both sides are locally owned cells.
    Internal,
    /// Opposite side is the ghost with local id `id`.
    PartitionGhost(usize),
}

impl Default for BoundaryTag {
    fn default() -> Self {
        BoundaryTag::Region(0)
    }
}

impl BoundaryTag {
    pub fn to_raw(self) -> i64 {
        match self {
            BoundaryTag::Region(id) => id as i64,
            BoundaryTag::Internal => -1,
            BoundaryTag::PartitionGhost(g) => -(g as i64) - 2,
        }
    }

    pub fn from_raw(raw: i64) -> Self {
        match raw {
            r if r >= 0 => BoundaryTag::Region(r as usize),
            -1 => BoundaryTag::Internal,
            r => BoundaryTag::PartitionGhost((-r - 2) as usize),
        }
    }

    /// True for internal and partition-boundary faces, i.e. faces with a
    /// neighbouring cell value on the far side.
    pub fn has_far_side(self) -> bool {
        !matches!(self, BoundaryTag::Region(_))
    }

    pub fn is_external(self) -> bool {
        matches!(self, BoundaryTag::Region(_))
    }

    pub fn ghost(self) -> Option<usize> {
        match self {
            BoundaryTag::PartitionGhost(g) => Some(g),
            _ => None,
        }
    }
}

/// Source of a value in an averaging or gradient map.
///
/// Cells sort before ghosts, each in local-id order, so maps keyed by
/// `Contributor` iterate deterministically.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Contributor {
    Cell(usize),
    Ghost(usize),
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contributor::Cell(c) => write!(f, "cell {c}"),
            Contributor::Ghost(g) => write!(f, "ghost {g}"),
        }
    }
}
