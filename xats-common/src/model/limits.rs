// xats-common/src/model/limits.rs
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_TOTAL_FILES: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Bounds applied while composing a document from fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositionLimits {
    pub max_file_size: u64,
    pub max_total_files: usize,
    pub max_depth: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for CompositionLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_files: DEFAULT_MAX_TOTAL_FILES,
            max_depth: DEFAULT_MAX_DEPTH,
            allowed_extensions: vec![".json".to_string()],
        }
    }
}

impl CompositionLimits {
    pub fn allows_extension(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
    }
}
