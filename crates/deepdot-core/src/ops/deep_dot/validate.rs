//! Shape validation gating the forward and backward passes.
//!
//! Checks run in a fixed order and short-circuit on the first failure; no
//! kernel computation happens after a rejection.

use crate::{Result, Shape, TensorError};

/// Validate the inputs of the forward `DeepDot` operation.
///
/// `origin` is `[B, H, W, C]`; `kernel` is `[B, Hk, Wk, K*K]` and may use
/// different spatial extents than the signal.
pub fn validate_forward(origin: &Shape, kernel: &Shape, kernel_size: usize) -> Result<()> {
    const OP: &str = "DeepDot";
    check_common(OP, "origin", origin, kernel, kernel_size)
}

/// Validate the inputs of the backward `GradDeepDot` operation.
///
/// Unlike forward, backward requires `origin` and `kernel` to share spatial
/// extents: the resolution-mapped case has no backward support.
pub fn validate_backward(
    grad_composed: &Shape,
    origin: &Shape,
    kernel: &Shape,
    kernel_size: usize,
) -> Result<()> {
    const OP: &str = "GradDeepDot";
    check_common(OP, "grad_composed", grad_composed, kernel, kernel_size)?;

    if origin != grad_composed {
        return Err(TensorError::shape_mismatch(
            OP,
            &format!("origin shape {grad_composed} (matching grad_composed)"),
            &format!("origin shape {origin}"),
        ));
    }
    if origin[1] != kernel[1] || origin[2] != kernel[2] {
        return Err(TensorError::shape_mismatch(
            OP,
            &format!("kernel spatial extents [{}, {}]", origin[1], origin[2]),
            &format!("kernel spatial extents [{}, {}]", kernel[1], kernel[2]),
        ));
    }
    Ok(())
}

fn check_common(
    op: &str,
    signal_name: &str,
    signal: &Shape,
    kernel: &Shape,
    kernel_size: usize,
) -> Result<()> {
    if kernel_size == 0 {
        return Err(TensorError::invalid_argument(
            op,
            "kernel_size must be positive",
        ));
    }
    if signal.rank() != 4 {
        return Err(TensorError::rank_mismatch(op, signal_name, 4, signal.rank()));
    }
    if kernel.rank() != 4 {
        return Err(TensorError::rank_mismatch(op, "kernel", 4, kernel.rank()));
    }
    if signal[0] != kernel[0] {
        return Err(TensorError::batch_mismatch(
            op,
            signal_name,
            signal[0],
            "kernel",
            kernel[0],
        ));
    }
    let taps = kernel_size * kernel_size;
    if kernel[3] != taps {
        return Err(TensorError::kernel_size_mismatch(op, taps, kernel[3]));
    }
    Ok(())
}
