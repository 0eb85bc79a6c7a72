//! Post-import material handling

pub mod normalizer;

pub use normalizer::{normalize_material, normalize_subtree, NormalizeReport};
