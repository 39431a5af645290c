//! The DeepDot operation: a local composition where the filter weights are
//! a fourth-order tensor of their own, one length-K² vector per spatial
//! location, optionally at a coarser or finer resolution than the signal.

pub mod forward;
pub mod geometry;
pub mod validate;

pub use forward::deep_dot;
pub use geometry::{ResolutionMap, WindowGeometry};
pub use validate::{validate_backward, validate_forward};
