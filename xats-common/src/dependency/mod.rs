// xats-common/src/dependency/mod.rs
pub mod resolver;

pub use resolver::{
    resolve_dependencies, DependencyConflict, DependencyError, DependencyNode,
    DependencyResolution, DependencyResolver, FlattenedDependency, ResolutionContext,
};
