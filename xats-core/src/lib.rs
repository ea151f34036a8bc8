// xats-core/src/lib.rs

pub mod compose;
pub mod registry;

// Re-export key types for easier use by the CLI crate
pub use compose::{
    BenchmarkReport, CircularReference, CompositionMetrics, CompositionResolver,
    CompositionResult, DocumentNode,
};
pub use registry::{fetch_verified, BatchResolution, RegistryResolver, ResolutionStats};
