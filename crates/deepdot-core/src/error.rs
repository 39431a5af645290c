use thiserror::Error;

/// Validation errors raised before any kernel computation runs.
///
/// Every variant is deterministic in the inputs: the same tensors produce
/// the same rejection, so none of these are retryable. A failed validation
/// produces no partial output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Rank mismatch in '{operation}': {input} must be rank {expected}, got rank {got}")]
    RankMismatch {
        operation: String,
        input: String,
        expected: usize,
        got: usize,
    },

    #[error(
        "Batch mismatch in '{operation}': {lhs} has batch {lhs_batch}, {rhs} has batch {rhs_batch}"
    )]
    BatchMismatch {
        operation: String,
        lhs: String,
        lhs_batch: usize,
        rhs: String,
        rhs_batch: usize,
    },

    #[error(
        "Kernel size mismatch in '{operation}': kernel depth is {got}, expected kernel_size^2 = {expected}"
    )]
    KernelSizeMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("Shape mismatch in '{operation}': expected {expected}, got {got}")]
    ShapeMismatch {
        operation: String,
        expected: String,
        got: String,
    },

    #[error("Invalid argument in '{operation}': {reason}")]
    InvalidArgument { operation: String, reason: String },
}

impl TensorError {
    pub fn rank_mismatch(operation: &str, input: &str, expected: usize, got: usize) -> Self {
        Self::RankMismatch {
            operation: operation.to_string(),
            input: input.to_string(),
            expected,
            got,
        }
    }

    pub fn batch_mismatch(
        operation: &str,
        lhs: &str,
        lhs_batch: usize,
        rhs: &str,
        rhs_batch: usize,
    ) -> Self {
        Self::BatchMismatch {
            operation: operation.to_string(),
            lhs: lhs.to_string(),
            lhs_batch,
            rhs: rhs.to_string(),
            rhs_batch,
        }
    }

    pub fn kernel_size_mismatch(operation: &str, expected: usize, got: usize) -> Self {
        Self::KernelSizeMismatch {
            operation: operation.to_string(),
            expected,
            got,
        }
    }

    pub fn shape_mismatch(operation: &str, expected: &str, got: &str) -> Self {
        Self::ShapeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub fn invalid_argument(operation: &str, reason: &str) -> Self {
        Self::InvalidArgument {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get the operation name for this error.
    pub fn operation(&self) -> &str {
        match self {
            Self::RankMismatch { operation, .. } => operation,
            Self::BatchMismatch { operation, .. } => operation,
            Self::KernelSizeMismatch { operation, .. } => operation,
            Self::ShapeMismatch { operation, .. } => operation,
            Self::InvalidArgument { operation, .. } => operation,
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;

impl From<ndarray::ShapeError> for TensorError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::InvalidArgument {
            operation: "tensor_creation".to_string(),
            reason: format!("shape error: {err}"),
        }
    }
}
