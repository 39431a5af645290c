pub mod deep_dot;
pub mod registry;
