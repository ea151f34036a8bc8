// xats-common/src/lib.rs
pub mod cache;
pub mod cancel;
pub mod config;
pub mod dependency;
pub mod error;
pub mod integrity;
pub mod model;
pub mod validation;
pub mod version;

// Re-export key types
pub use cache::{MemoryResolutionCache, ResolutionCache};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::Config;
pub use error::{ErrorCode, ReportedError, Result, XatsError};
pub use model::{Reference, RegistryConfig, ResolvedReference};
pub use validation::ValidationReport;
