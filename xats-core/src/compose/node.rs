// xats-core/src/compose/node.rs
use serde_json::{Map, Value};
use xats_common::model::FragmentReference;

const REF_KEY: &str = "$ref";
const METADATA_KEY: &str = "metadata";
const BLOCK_TYPE_KEY: &str = "blockType";

/// A document tree classified up front, so the walk never has to sniff
/// object shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    /// `{"$ref": "...", "metadata": ...}` and nothing else.
    Reference(FragmentReference),
    /// An object carrying a string `blockType`.
    ContentBlock {
        block_type: String,
        fields: Vec<(String, DocumentNode)>,
    },
    Object(Vec<(String, DocumentNode)>),
    Array(Vec<DocumentNode>),
    Scalar(Value),
}

impl DocumentNode {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(map) => match as_reference(&map) {
                Some(reference) => Self::Reference(reference),
                None => {
                    let block_type = map
                        .get(BLOCK_TYPE_KEY)
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    let fields = map
                        .into_iter()
                        .map(|(k, v)| (k, Self::classify(v)))
                        .collect();
                    match block_type {
                        Some(block_type) => Self::ContentBlock { block_type, fields },
                        None => Self::Object(fields),
                    }
                }
            },
            Value::Array(items) => Self::Array(items.into_iter().map(Self::classify).collect()),
            scalar => Self::Scalar(scalar),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Reference(reference) => reference_value(reference),
            Self::ContentBlock { fields, .. } | Self::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect(),
            ),
            Self::Array(items) => Value::Array(items.into_iter().map(Self::into_value).collect()),
            Self::Scalar(v) => v,
        }
    }

    /// Number of fragment references anywhere below this node.
    pub fn reference_count(&self) -> usize {
        match self {
            Self::Reference(_) => 1,
            Self::ContentBlock { fields, .. } | Self::Object(fields) => {
                fields.iter().map(|(_, n)| n.reference_count()).sum()
            }
            Self::Array(items) => items.iter().map(Self::reference_count).sum(),
            Self::Scalar(_) => 0,
        }
    }
}

fn as_reference(map: &Map<String, Value>) -> Option<FragmentReference> {
    let ref_path = map.get(REF_KEY)?.as_str()?;
    if map.keys().any(|k| k != REF_KEY && k != METADATA_KEY) {
        return None;
    }
    Some(FragmentReference {
        ref_path: ref_path.to_string(),
        metadata: map.get(METADATA_KEY).cloned(),
    })
}

/// Serializes a reference back to the shape it was read from.
pub(crate) fn reference_value(reference: FragmentReference) -> Value {
    let mut map = Map::new();
    map.insert(REF_KEY.to_string(), Value::String(reference.ref_path));
    if let Some(metadata) = reference.metadata {
        map.insert(METADATA_KEY.to_string(), metadata);
    }
    Value::Object(map)
}
