// xats-aio/src/json_io.rs
use std::path::Path;

use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;
use xats_common::error::Result;

/// Asynchronously reads and deserializes data from a JSON file.
pub async fn read_json_async<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Async Reading JSON from: {}", path.display());
    let json_bytes = fs::read(path).await?;
    // Deserialize synchronously (CPU-bound, usually fast)
    Ok(serde_json::from_slice(&json_bytes)?)
}
