//! Operation registry and static shape inference.
//!
//! Host execution engines look operations up by name and evaluate their
//! shape functions before running any kernel. The global registry is built
//! once at first use and never mutated afterwards.

use crate::{Result, Shape, TensorError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Argument definition for an operation input or output.
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub doc: String,
}

/// Attribute definition.
#[derive(Debug, Clone)]
pub struct AttrDef {
    pub name: String,
    pub attr_type: AttrType,
    pub default: Option<AttrValue>,
    pub doc: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    Int,
    Float,
    Bool,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

/// Shape inference function type.
pub type ShapeFn =
    Arc<dyn Fn(&[&Shape], &HashMap<String, AttrValue>) -> Result<Vec<Shape>> + Send + Sync>;

/// Metadata for an operation.
#[derive(Clone)]
pub struct OpDef {
    pub name: String,
    pub inputs: Vec<ArgDef>,
    pub outputs: Vec<ArgDef>,
    pub attrs: HashMap<String, AttrDef>,
    pub shape_fn: Option<ShapeFn>,
    /// Name of the gradient operation, if differentiable.
    pub grad_fn: Option<String>,
    pub doc: String,
}

/// Name-keyed operation registry.
pub struct OpRegistry {
    ops: RwLock<HashMap<String, OpDef>>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self {
            ops: RwLock::new(HashMap::new()),
        }
    }

    /// Register an operation. Fails if the name is already taken.
    pub fn register_op(&self, op_def: OpDef) -> Result<()> {
        let mut ops = self.ops.write().unwrap();
        if ops.contains_key(&op_def.name) {
            return Err(TensorError::invalid_argument(
                "register_op",
                &format!("operation '{}' already registered", op_def.name),
            ));
        }
        log::debug!("registered operation '{}'", op_def.name);
        ops.insert(op_def.name.clone(), op_def);
        Ok(())
    }

    pub fn get_op(&self, name: &str) -> Option<OpDef> {
        let ops = self.ops.read().unwrap();
        ops.get(name).cloned()
    }

    pub fn list_ops(&self) -> Vec<String> {
        let mut names: Vec<_> = self.ops.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run an operation's shape function on the given input shapes.
    pub fn infer_shapes(
        &self,
        name: &str,
        inputs: &[&Shape],
        attrs: &HashMap<String, AttrValue>,
    ) -> Result<Vec<Shape>> {
        let op_def = self.get_op(name).ok_or_else(|| {
            TensorError::invalid_argument(
                "infer_shapes",
                &format!("operation '{name}' not registered"),
            )
        })?;
        let shape_fn = op_def.shape_fn.as_ref().ok_or_else(|| {
            TensorError::invalid_argument(
                "infer_shapes",
                &format!("operation '{name}' has no shape function"),
            )
        })?;
        shape_fn(inputs, attrs)
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn kernel_size_attr(attrs: &HashMap<String, AttrValue>, op: &str) -> Result<usize> {
    match attrs.get("kernel_size") {
        Some(AttrValue::Int(k)) if *k > 0 => Ok(*k as usize),
        Some(AttrValue::Int(k)) => Err(TensorError::invalid_argument(
            op,
            &format!("kernel_size must be positive, got {k}"),
        )),
        Some(other) => Err(TensorError::invalid_argument(
            op,
            &format!("kernel_size must be an int attribute, got {other:?}"),
        )),
        None => Err(TensorError::invalid_argument(
            op,
            "missing required attribute 'kernel_size'",
        )),
    }
}

fn arg(name: &str, doc: &str) -> ArgDef {
    ArgDef {
        name: name.to_string(),
        doc: doc.to_string(),
    }
}

fn kernel_size_attrs() -> HashMap<String, AttrDef> {
    HashMap::from([(
        "kernel_size".to_string(),
        AttrDef {
            name: "kernel_size".to_string(),
            attr_type: AttrType::Int,
            default: None,
            doc: "Side length K of the square neighborhood window".to_string(),
        },
    )])
}

/// Register the built-in operations.
fn register_builtin_ops(registry: &OpRegistry) {
    registry
        .register_op(OpDef {
            name: "DeepDot".to_string(),
            inputs: vec![
                arg("origin", "Input signal, [B, H, W, C]"),
                arg("kernel", "Per-location filter weights, [B, Hk, Wk, K*K]"),
            ],
            outputs: vec![arg("composed", "Composed output, same shape as origin")],
            attrs: kernel_size_attrs(),
            shape_fn: Some(Arc::new(|inputs, attrs| {
                const OP: &str = "DeepDot";
                if inputs.len() != 2 {
                    return Err(TensorError::invalid_argument(
                        OP,
                        &format!("expected 2 inputs, got {}", inputs.len()),
                    ));
                }
                kernel_size_attr(attrs, OP)?;
                // The composed output always takes origin's shape.
                Ok(vec![inputs[0].clone()])
            })),
            grad_fn: Some("GradDeepDot".to_string()),
            doc: "Spatially-varying local composition of a signal with a \
                  per-location kernel tensor"
                .to_string(),
        })
        .unwrap();

    registry
        .register_op(OpDef {
            name: "GradDeepDot".to_string(),
            inputs: vec![
                arg("grad_composed", "Upstream gradient, [B, H, W, C]"),
                arg("origin", "Forward input signal, [B, H, W, C]"),
                arg("kernel", "Forward filter weights, [B, H, W, K*K]"),
            ],
            outputs: vec![
                arg("grad_origin", "Gradient w.r.t. origin, same shape as origin"),
                arg("grad_kernel", "Gradient w.r.t. kernel, same shape as kernel"),
            ],
            attrs: kernel_size_attrs(),
            shape_fn: Some(Arc::new(|inputs, attrs| {
                const OP: &str = "GradDeepDot";
                if inputs.len() != 3 {
                    return Err(TensorError::invalid_argument(
                        OP,
                        &format!("expected 3 inputs, got {}", inputs.len()),
                    ));
                }
                kernel_size_attr(attrs, OP)?;
                // Gradients take the shapes of the tensors they differentiate.
                Ok(vec![inputs[1].clone(), inputs[2].clone()])
            })),
            grad_fn: None,
            doc: "Exact gradient of DeepDot with respect to both origin and kernel".to_string(),
        })
        .unwrap();
}

lazy_static::lazy_static! {
    /// Global operation registry, built once and immutable afterwards.
    pub static ref OP_REGISTRY: OpRegistry = {
        let registry = OpRegistry::new();
        register_builtin_ops(&registry);
        registry
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ops_registered() {
        assert_eq!(OP_REGISTRY.list_ops(), vec!["DeepDot", "GradDeepDot"]);
        let op = OP_REGISTRY.get_op("DeepDot").unwrap();
        assert_eq!(op.grad_fn.as_deref(), Some("GradDeepDot"));
        assert!(op.attrs.contains_key("kernel_size"));
    }

    #[test]
    fn test_deep_dot_shape_inference() {
        let origin = Shape::from_slice(&[1, 5, 5, 1]);
        let kernel = Shape::from_slice(&[1, 5, 5, 4]);
        let attrs = HashMap::from([("kernel_size".to_string(), AttrValue::Int(2))]);

        let shapes = OP_REGISTRY
            .infer_shapes("DeepDot", &[&origin, &kernel], &attrs)
            .unwrap();
        assert_eq!(shapes, vec![origin]);
    }

    #[test]
    fn test_grad_deep_dot_shape_inference() {
        let grad = Shape::from_slice(&[2, 4, 4, 3]);
        let origin = Shape::from_slice(&[2, 4, 4, 3]);
        let kernel = Shape::from_slice(&[2, 4, 4, 9]);
        let attrs = HashMap::from([("kernel_size".to_string(), AttrValue::Int(3))]);

        let shapes = OP_REGISTRY
            .infer_shapes("GradDeepDot", &[&grad, &origin, &kernel], &attrs)
            .unwrap();
        assert_eq!(shapes, vec![origin, kernel]);
    }

    #[test]
    fn test_shape_inference_requires_positive_kernel_size() {
        let origin = Shape::from_slice(&[1, 5, 5, 1]);
        let kernel = Shape::from_slice(&[1, 5, 5, 4]);

        let missing = HashMap::new();
        assert!(OP_REGISTRY
            .infer_shapes("DeepDot", &[&origin, &kernel], &missing)
            .is_err());

        let nonpositive = HashMap::from([("kernel_size".to_string(), AttrValue::Int(0))]);
        assert!(OP_REGISTRY
            .infer_shapes("DeepDot", &[&origin, &kernel], &nonpositive)
            .is_err());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = OpRegistry::new();
        let make_op = || OpDef {
            name: "DeepDot".to_string(),
            inputs: vec![],
            outputs: vec![],
            attrs: HashMap::new(),
            shape_fn: None,
            grad_fn: None,
            doc: String::new(),
        };
        registry.register_op(make_op()).unwrap();
        assert!(registry.register_op(make_op()).is_err());
    }

    #[test]
    fn test_unknown_op_lookup() {
        assert!(OP_REGISTRY.get_op("Conv2D").is_none());
        let attrs = HashMap::new();
        assert!(OP_REGISTRY.infer_shapes("Conv2D", &[], &attrs).is_err());
    }
}
