// xats-core/src/compose/mod.rs

pub mod benchmark;
pub mod node;
pub mod resolver;
mod sandbox;

pub use benchmark::BenchmarkReport;
pub use node::DocumentNode;
pub use resolver::{CircularReference, CompositionMetrics, CompositionResolver, CompositionResult};
