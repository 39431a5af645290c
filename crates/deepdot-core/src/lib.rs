//! Core tensor types and the forward DeepDot operation.
//!
//! DeepDot is a spatially-varying local convolution: instead of one shared
//! filter, the kernel is itself a tensor carrying a length-K² weight vector
//! per spatial location, possibly at a different resolution than the signal
//! being filtered. The backward pass lives in `deepdot-autograd`.

pub mod error;
pub mod ops;
pub mod shape;
pub mod tensor;

pub use error::{Result, TensorError};
pub use ops::deep_dot::{deep_dot, ResolutionMap, WindowGeometry};
pub use ops::registry::{AttrValue, OpDef, OpRegistry, OP_REGISTRY};
pub use shape::Shape;
pub use tensor::Tensor;
