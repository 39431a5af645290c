//! Forward pass of the DeepDot composition.

use crate::ops::deep_dot::geometry::{ResolutionMap, WindowGeometry};
use crate::ops::deep_dot::validate::validate_forward;
use crate::{Result, Tensor};
use ndarray::{Array4, Ix4, Zip};
use num_traits::Float;

/// Compose `origin` with a per-location kernel.
///
/// `origin` is `[B, H, W, C]`; `kernel` is `[B, Hk, Wk, K*K]`, one flattened
/// K×K weight vector per kernel-grid location, shared across channels. Each
/// output cell sums its in-bounds neighborhood weighted by the kernel vector
/// at the resolution-mapped coordinate; out-of-bounds neighbors contribute
/// zero.
///
/// Work is split across the batch axis only. Batch slices are disjoint and
/// the in-batch accumulation order is the serial `(h, w, k, i, j)` order, so
/// the output is bit-identical to a single-threaded run.
pub fn deep_dot<T>(origin: &Tensor<T>, kernel: &Tensor<T>, kernel_size: usize) -> Result<Tensor<T>>
where
    T: Float + Send + Sync + 'static,
{
    validate_forward(origin.shape(), kernel.shape(), kernel_size)?;

    let origin4 = origin.array().view().into_dimensionality::<Ix4>()?;
    let kernel4 = kernel.array().view().into_dimensionality::<Ix4>()?;

    let (batch, height, width, channels) = origin4.dim();
    let (_, kernel_height, kernel_width, _) = kernel4.dim();

    let window = WindowGeometry::new(kernel_size);
    let resize = ResolutionMap::new((height, width), (kernel_height, kernel_width));

    let mut composed = Array4::<T>::zeros((batch, height, width, channels));

    Zip::from(composed.outer_iter_mut())
        .and(origin4.outer_iter())
        .and(kernel4.outer_iter())
        .par_for_each(|mut composed_b, origin_b, kernel_b| {
            for h in 0..height {
                let kh = resize.row(h);
                for w in 0..width {
                    let kw = resize.col(w);
                    for k in 0..channels {
                        let mut sum = T::zero();
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
                                let tap = kernel_b[[kh, kw, window.depth(i, j)]];
                                sum = sum + origin_b[[hh as usize, ww as usize, k]] * tap;
                            }
                        }
                        composed_b[[h, w, k]] = sum;
                    }
                }
            }
        });

    Ok(Tensor::from_array(composed.into_dyn()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorError;

    fn assert_near(actual: &Tensor<f32>, expected: &[f32], tolerance: f32) {
        let data = actual.as_slice().unwrap();
        assert_eq!(data.len(), expected.len());
        for (index, (&a, &e)) in data.iter().zip(expected).enumerate() {
            assert!(
                (a - e).abs() < tolerance,
                "element {index}: got {a}, expected {e}"
            );
        }
    }

    #[test]
    fn test_identity_kernel_size_scales_elementwise() {
        // K = 1 reduces the window to the single offset (0, 0).
        let origin = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[1, 2, 2, 1]).unwrap();
        let kernel = Tensor::from_vec(vec![2.0f32; 4], &[1, 2, 2, 1]).unwrap();

        let composed = deep_dot(&origin, &kernel, 1).unwrap();

        assert_eq!(composed.shape(), origin.shape());
        assert_near(&composed, &[2.0, 4.0, 6.0, 8.0], 1e-6);
    }

    #[test]
    fn test_five_by_five_selector_kernel() {
        // Each location's kernel vector selects (or scales) one neighbor
        // out of the K=2 window {-1, 0} x {-1, 0}.
        let origin = Tensor::from_vec(
            vec![
                1.0f32, 2.0, 3.0, 4.0, 5.0, //
                3.0, 4.0, 5.0, 6.0, 7.0, //
                0.0, 1.0, 2.0, 3.0, 4.0, //
                3.0, 2.0, 6.0, 1.0, 0.0, //
                3.0, 8.0, 2.0, 3.0, 0.0,
            ],
            &[1, 5, 5, 1],
        )
        .unwrap();
        let kernel = Tensor::from_vec(
            vec![
                0.0f32, 0.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, 0.0, //
                1.0, 0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                0.0, 0.0, 0.0, 1.5, //
                0.0, 0.0, 1.5, 0.0, //
                0.0, 1.5, 0.0, 0.0, //
                1.5, 0.0, 0.0, 0.0, //
                1.5, 1.5, 0.0, 0.0, //
                1.5, 0.0, 1.5, 0.0, //
                1.5, 0.0, 0.0, 1.5, //
                0.0, 1.5, 1.5, 0.0, //
                0.0, 1.5, 0.0, 1.5, //
                0.0, 0.0, 1.5, 1.5, //
                1.0, 2.0, 0.0, 0.0, //
                2.0, 0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, 2.0, //
                0.0, 1.0, 2.0, 0.0, //
                0.0, 2.0, 0.0, 1.0,
            ],
            &[1, 5, 5, 4],
        )
        .unwrap();

        let composed = deep_dot(&origin, &kernel, 2).unwrap();

        let expected = [
            1.0f32, 1.0, 0.0, 0.0, 0.0, //
            0.0, 5.0, 7.0, 10.0, 13.0, //
            0.0, 0.0, 7.5, 7.5, 19.5, //
            0.0, 3.0, 6.0, 6.0, 1.5, //
            6.0, 9.0, 6.0, 5.0, 0.0,
        ];
        assert_near(&composed, &expected, 1e-6);
    }

    #[test]
    fn test_box_filter() {
        // Uniform taps of 1/9 with K = 3 give the zero-padded 3x3 box blur.
        let origin = Tensor::from_vec(
            vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            &[1, 3, 3, 1],
        )
        .unwrap();
        let kernel = Tensor::from_vec(vec![1.0f32 / 9.0; 9 * 9], &[1, 3, 3, 9]).unwrap();

        let composed = deep_dot(&origin, &kernel, 3).unwrap();

        let expected: Vec<f32> = [12.0f32, 21.0, 16.0, 27.0, 45.0, 33.0, 24.0, 39.0, 28.0]
            .iter()
            .map(|&sum| sum / 9.0)
            .collect();
        assert_near(&composed, &expected, 1e-6);
    }

    #[test]
    fn test_single_pixel_zero_padding() {
        // On a 1x1 signal with K = 2 only the (0, 0) offset is in bounds.
        let origin = Tensor::from_vec(vec![3.0f32], &[1, 1, 1, 1]).unwrap();
        let kernel = Tensor::from_vec(vec![10.0f32, 20.0, 30.0, 40.0], &[1, 1, 1, 4]).unwrap();

        let composed = deep_dot(&origin, &kernel, 2).unwrap();

        // Depth 3 is the (0, 0) tap for K = 2.
        assert_near(&composed, &[3.0 * 40.0], 1e-6);
    }

    #[test]
    fn test_downsampled_kernel_grid() {
        // A 2x2 kernel grid drives a 4x4 signal: each 2x2 block of output
        // cells shares the kernel vector at the floor-mapped coordinate.
        let origin = Tensor::from_vec(vec![1.0f32; 16], &[1, 4, 4, 1]).unwrap();
        let kernel = Tensor::from_vec(vec![2.0f32, 3.0, 4.0, 5.0], &[1, 2, 2, 1]).unwrap();

        let composed = deep_dot(&origin, &kernel, 1).unwrap();

        let expected = [
            2.0f32, 2.0, 3.0, 3.0, //
            2.0, 2.0, 3.0, 3.0, //
            4.0, 4.0, 5.0, 5.0, //
            4.0, 4.0, 5.0, 5.0,
        ];
        assert_near(&composed, &expected, 1e-6);
    }

    #[test]
    fn test_kernel_shared_across_channels() {
        let origin =
            Tensor::from_vec(vec![1.0f32, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0], &[1, 2, 2, 2])
                .unwrap();
        let kernel = Tensor::from_vec(vec![0.5f32; 4], &[1, 2, 2, 1]).unwrap();

        let composed = deep_dot(&origin, &kernel, 1).unwrap();

        assert_near(&composed, &[0.5, 5.0, 1.0, 10.0, 1.5, 15.0, 2.0, 20.0], 1e-6);
    }

    #[test]
    fn test_batched_inputs_are_independent() {
        let origin = Tensor::from_vec(
            vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            &[2, 2, 2, 1],
        )
        .unwrap();
        let kernel = Tensor::from_vec(
            vec![1.0f32, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0],
            &[2, 2, 2, 1],
        )
        .unwrap();

        let composed = deep_dot(&origin, &kernel, 1).unwrap();

        assert_near(&composed, &[1.0, 2.0, 3.0, 4.0, 10.0, 12.0, 14.0, 16.0], 1e-6);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let origin = Tensor::from_vec(
            (0..2 * 6 * 6 * 3).map(|i| (i % 17) as f32 * 0.37 - 2.1).collect(),
            &[2, 6, 6, 3],
        )
        .unwrap();
        let kernel = Tensor::from_vec(
            (0..2 * 6 * 6 * 9).map(|i| (i % 11) as f32 * 0.41 - 1.3).collect(),
            &[2, 6, 6, 9],
        )
        .unwrap();

        let first = deep_dot(&origin, &kernel, 3).unwrap();
        let second = deep_dot(&origin, &kernel, 3).unwrap();

        assert_eq!(first.as_slice().unwrap(), second.as_slice().unwrap());
    }

    #[test]
    fn test_rejects_invalid_shapes_before_computing() {
        let origin = Tensor::<f32>::zeros(&[2, 4, 4, 1]);
        let kernel = Tensor::<f32>::zeros(&[1, 4, 4, 4]);
        assert!(matches!(
            deep_dot(&origin, &kernel, 2),
            Err(TensorError::BatchMismatch { .. })
        ));
    }
}
