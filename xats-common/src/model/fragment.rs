// xats-common/src/model/fragment.rs
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// An include-reference found while walking a document: `{"$ref": "...", "metadata": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentReference {
    #[serde(rename = "$ref")]
    pub ref_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// What a [`FragmentLoader`] hands back for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFragment {
    pub content: String,
    pub checksum: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFragment {
    pub path: String,
    pub content: Value,
    pub checksum: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

/// Source of fragment files. Implementations must not follow the path
/// outside what they are given; sandboxing happens before `load` is called.
#[async_trait]
pub trait FragmentLoader: Send + Sync {
    /// Size of the file in bytes, without reading it.
    async fn size(&self, path: &Path) -> Result<u64>;

    async fn load(&self, path: &Path) -> Result<LoadedFragment>;
}

/// Boolean gate confirming a loaded fragment is a well-formed partial document.
pub trait FragmentSchema: Send + Sync {
    fn check(&self, fragment: &Value) -> bool;
}

/// Requires an object with a non-empty string `id` and `language`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialDocumentCheck;

impl FragmentSchema for PartialDocumentCheck {
    fn check(&self, fragment: &Value) -> bool {
        let non_empty = |key: &str| {
            fragment
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        };
        fragment.is_object() && non_empty("id") && non_empty("language")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn partial_document_needs_id_and_language() {
        let check = PartialDocumentCheck;
        assert!(check.check(&json!({"id": "ch1", "language": "en", "contents": []})));
        assert!(!check.check(&json!({"id": "ch1"})));
        assert!(!check.check(&json!({"id": "", "language": "en"})));
        assert!(!check.check(&json!(["id", "language"])));
    }

    #[test]
    fn reference_uses_dollar_ref_key() {
        let r: FragmentReference =
            serde_json::from_value(json!({"$ref": "chapters/one.json"})).unwrap();
        assert_eq!(r.ref_path, "chapters/one.json");
        assert_eq!(r.metadata, None);
    }
}
