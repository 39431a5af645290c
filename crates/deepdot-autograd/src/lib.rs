//! Backward pass for the DeepDot operation.
//!
//! The gradient formula here is hand-derived as the exact adjoint of the
//! forward composition, not produced by automatic differentiation.

pub mod ops;

pub use ops::deep_dot::{deep_dot_with_grad, grad_deep_dot, DeepDotBackward};
