// xats-aio/src/loader.rs
use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, error};
use xats_common::error::{Result, XatsError};
use xats_common::model::{FragmentLoader, LoadedFragment};

use crate::checksum::sha256_hex;

/// Loads fragment files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFragmentLoader;

impl FsFragmentLoader {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, e: io::Error) -> XatsError {
    if e.kind() == io::ErrorKind::NotFound {
        XatsError::FragmentNotFound(path.display().to_string())
    } else {
        error!("Failed to read fragment {}: {}", path.display(), e);
        XatsError::from(e)
    }
}

#[async_trait]
impl FragmentLoader for FsFragmentLoader {
    async fn size(&self, path: &Path) -> Result<u64> {
        let meta = fs::metadata(path).await.map_err(|e| map_io(path, e))?;
        if !meta.is_file() {
            return Err(XatsError::FragmentNotFound(path.display().to_string()));
        }
        Ok(meta.len())
    }

    async fn load(&self, path: &Path) -> Result<LoadedFragment> {
        debug!("Loading fragment: {}", path.display());
        let bytes = fs::read(path).await.map_err(|e| map_io(path, e))?;
        let last_modified = match fs::metadata(path).await {
            Ok(meta) => meta.modified().ok().map(DateTime::<Utc>::from),
            Err(_) => None,
        };
        let checksum = sha256_hex(&bytes);
        let size = bytes.len() as u64;
        let content = String::from_utf8(bytes).map_err(|e| {
            XatsError::ParseError("fragment", format!("{} is not UTF-8: {e}", path.display()))
        })?;
        debug!("Loaded {} bytes from {}", size, path.display());
        Ok(LoadedFragment {
            content,
            checksum,
            size,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use xats_common::error::ErrorCode;

    use super::*;

    #[tokio::test]
    async fn loads_content_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.json");
        let body = r#"{"id":"ch1","language":"en"}"#;
        fs::write(&path, body).await.unwrap();

        let loader = FsFragmentLoader::new();
        assert_eq!(loader.size(&path).await.unwrap(), body.len() as u64);
        let loaded = loader.load(&path).await.unwrap();
        assert_eq!(loaded.content, body);
        assert_eq!(loaded.size, body.len() as u64);
        assert_eq!(loaded.checksum, sha256_hex(body.as_bytes()));
        assert!(loaded.last_modified.is_some());
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsFragmentLoader;
        let err = loader.load(&dir.path().join("nope.json")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
        let err = loader.size(dir.path()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }
}
