//! Validation helpers shared by graph resolution.

pub mod validation;

pub use validation::{find_cycle, topological_order, validate_name, NameKind};
