// xats-common/src/validation/mod.rs
//! Two-phase validation of configuration objects.
//!
//! Phase one walks the raw JSON and reports every structural problem
//! (missing fields, wrong types, unknown enum values). Phase two only runs
//! when the structure is sound and applies cross-field business rules.
//! Errors block use; warnings are advisory.
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod limits;
pub mod registry;
mod structural;

pub use cache::{validate_cache, validate_cache_config};
pub use limits::{validate_limits, validate_limits_value};
pub use registry::{parse_registry_config, validate_registry, validate_registry_config};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self::new(errors, Vec::new())
    }

    pub fn new(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub(crate) fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    pub(crate) fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub(crate) fn ok() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
