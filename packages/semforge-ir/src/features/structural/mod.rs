//! Per-file structural IR: the canonical output of the (external) parsers.

mod ir;

pub use ir::{StructuralError, StructuralIR};
