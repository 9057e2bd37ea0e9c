mod engine;

pub use engine::{evaluate, evaluate_fields};
