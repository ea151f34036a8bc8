// xats-common/src/model/mod.rs
pub mod cache_policy;
pub mod fragment;
pub mod limits;
pub mod reference;
pub mod registry;
pub mod resolved;

// Re-export
pub use cache_policy::CacheConfig;
pub use fragment::{
    FragmentLoader, FragmentReference, FragmentSchema, LoadedFragment, PartialDocumentCheck,
    ResolvedFragment,
};
pub use limits::CompositionLimits;
pub use reference::{validate_reference, Reference};
pub use registry::{
    FileRecord, PackageRecord, Registry, RegistryConfig, RegistryDescriptor, TrustLevel,
    VersionRecord,
};
pub use resolved::{PackageMetadata, ResolvedReference};
