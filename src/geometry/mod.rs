//! Geometric preprocessing of a local mesh.
//!
//! [`metrics`] fills face and cell measures; [`interpolation`] derives the
//! averaging and gradient weights from them.

pub mod interpolation;
pub mod metrics;

pub use metrics::GeometryCalculator;
