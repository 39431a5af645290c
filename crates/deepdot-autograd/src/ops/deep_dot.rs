//! Backward pass for DeepDot.
//!
//! `grad_deep_dot` is the exact adjoint of the forward composition under
//! the equal-resolution restriction: backward requires `origin` and
//! `kernel` to share spatial extents, so no resolution mapping applies.

use deepdot_core::ops::deep_dot::{deep_dot, validate_backward, WindowGeometry};
use deepdot_core::{Result, Tensor};
use ndarray::{Array4, Ix4, Zip};
use num_traits::Float;

/// Compute the gradients of DeepDot with respect to both inputs.
///
/// For every output cell the upstream scalar `g` is scattered back through
/// the same window geometry the forward pass read through:
/// `grad_origin[b, h+i, w+j, k] += kernel[b, h, w, depth(i, j)] * g` and
/// `grad_kernel[b, h, w, depth(i, j)] += origin[b, h+i, w+j, k] * g`.
///
/// The scatter into `grad_origin` overlaps across neighboring source cells,
/// so work is partitioned by batch only: batch slices are disjoint and each
/// batch accumulates in the serial `(h, w, k, i, j)` order, making the
/// result bit-identical to a single-threaded run.
pub fn grad_deep_dot<T>(
    grad_composed: &Tensor<T>,
    origin: &Tensor<T>,
    kernel: &Tensor<T>,
    kernel_size: usize,
) -> Result<(Tensor<T>, Tensor<T>)>
where
    T: Float + Send + Sync + 'static,
{
    validate_backward(
        grad_composed.shape(),
        origin.shape(),
        kernel.shape(),
        kernel_size,
    )?;

    let grad4 = grad_composed.array().view().into_dimensionality::<Ix4>()?;
    let origin4 = origin.array().view().into_dimensionality::<Ix4>()?;
    let kernel4 = kernel.array().view().into_dimensionality::<Ix4>()?;

    let (batch, height, width, channels) = origin4.dim();
    let taps = kernel4.dim().3;

    let window = WindowGeometry::new(kernel_size);

    let mut grad_origin = Array4::<T>::zeros((batch, height, width, channels));
    let mut grad_kernel = Array4::<T>::zeros((batch, height, width, taps));

    Zip::from(grad_origin.outer_iter_mut())
        .and(grad_kernel.outer_iter_mut())
        .and(grad4.outer_iter())
        .and(origin4.outer_iter())
        .and(kernel4.outer_iter())
        .par_for_each(
            |mut grad_origin_b, mut grad_kernel_b, grad_b, origin_b, kernel_b| {
                for h in 0..height {
                    for w in 0..width {
                        for k in 0..channels {
                            let g = grad_b[[h, w, k]];
                            for i in window.start()..window.end() {
                                let hh = h as isize + i;
                                if hh < 0 || hh >= height as isize {
                                    continue;
                                }
                                for j in window.start()..window.end() {
                                    let ww = w as isize + j;
                                    if ww < 0 || ww >= width as isize {
                                        continue;
                                    }
                                    let depth = window.depth(i, j);
                                    let (hh, ww) = (hh as usize, ww as usize);
                                    grad_origin_b[[hh, ww, k]] =
                                        grad_origin_b[[hh, ww, k]] + kernel_b[[h, w, depth]] * g;
                                    grad_kernel_b[[h, w, depth]] =
                                        grad_kernel_b[[h, w, depth]] + origin_b[[hh, ww, k]] * g;
                                }
                            }
                        }
                    }
                }
            },
        );

    Ok((
        Tensor::from_array(grad_origin.into_dyn()),
        Tensor::from_array(grad_kernel.into_dyn()),
    ))
}

/// Handle for computing both gradients of a composed output.
///
/// Couples a forward invocation with its backward, the way the original
/// operation pairs composition with a custom gradient. Holds borrows of the
/// forward inputs; call [`DeepDotBackward::grad`] with the upstream
/// gradient once it is known.
pub struct DeepDotBackward<'a, T> {
    origin: &'a Tensor<T>,
    kernel: &'a Tensor<T>,
    kernel_size: usize,
}

impl<T> DeepDotBackward<'_, T>
where
    T: Float + Send + Sync + 'static,
{
    /// Gradients with respect to `(origin, kernel)`.
    pub fn grad(&self, grad_composed: &Tensor<T>) -> Result<(Tensor<T>, Tensor<T>)> {
        grad_deep_dot(grad_composed, self.origin, self.kernel, self.kernel_size)
    }
}

/// Run the forward composition and return it together with a backward handle.
///
/// Backward requires equal resolution, so this wrapper only accepts inputs
/// the backward pass can handle; use [`deep_dot`] directly for the
/// resolution-mapped forward-only case.
pub fn deep_dot_with_grad<'a, T>(
    origin: &'a Tensor<T>,
    kernel: &'a Tensor<T>,
    kernel_size: usize,
) -> Result<(Tensor<T>, DeepDotBackward<'a, T>)>
where
    T: Float + Send + Sync + 'static,
{
    validate_backward(origin.shape(), origin.shape(), kernel.shape(), kernel_size)?;
    let composed = deep_dot(origin, kernel, kernel_size)?;
    Ok((
        composed,
        DeepDotBackward {
            origin,
            kernel,
            kernel_size,
        },
    ))
}
