pub mod deep_dot;
