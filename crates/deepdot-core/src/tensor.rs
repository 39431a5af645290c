//! Dense row-major tensor over an owned `ndarray` buffer.
//!
//! Tensors here are CPU-resident, caller-allocated, and single-use per
//! operation invocation: inputs are immutable and outputs are written once.
//! All multi-index access goes through `ndarray`, which bounds-checks every
//! lookup.

use crate::{Result, Shape, TensorError};
use ndarray::{ArrayD, IxDyn};
use num_traits::Zero;

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    storage: ArrayD<T>,
    shape: Shape,
}

impl<T> Tensor<T> {
    /// Create a tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self
    where
        T: Clone + Zero,
    {
        Self::from_array(ArrayD::zeros(IxDyn(shape)))
    }

    /// Create a tensor from a flat row-major data vector with the given shape.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let elements: usize = shape.iter().product();
        if data.len() != elements {
            return Err(TensorError::invalid_argument(
                "tensor_creation",
                &format!(
                    "data length {} does not match shape {:?} ({} elements)",
                    data.len(),
                    shape,
                    elements
                ),
            ));
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(Self::from_array(array))
    }

    /// Wrap an existing `ndarray` array.
    pub fn from_array(array: ArrayD<T>) -> Self {
        let shape = Shape::from_slice(array.shape());
        Self {
            storage: array,
            shape,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// The underlying array.
    pub fn array(&self) -> &ArrayD<T> {
        &self.storage
    }

    /// Consume the tensor, returning the underlying array.
    pub fn into_array(self) -> ArrayD<T> {
        self.storage
    }

    /// Contiguous row-major view of the data, if the layout permits.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.storage.as_slice()
    }

    /// Bounds-checked element lookup.
    pub fn get(&self, index: &[usize]) -> Option<T>
    where
        T: Clone,
    {
        if index.len() != self.storage.ndim() {
            return None;
        }
        self.storage.get(index).cloned()
    }
}
