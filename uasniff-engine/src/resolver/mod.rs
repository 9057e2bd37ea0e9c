mod graph;
mod resolve;

pub use graph::FieldDependencyGraph;
pub use resolve::{resolve, ResolvePlan};
