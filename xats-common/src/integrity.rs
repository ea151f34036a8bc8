// xats-common/src/integrity.rs
//! `<algorithm>-<base64>` content hashes.
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::error::{Result, XatsError};

static INTEGRITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(sha256|sha384|sha512)-[A-Za-z0-9+/]+={0,2}$").expect("integrity pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
            Self::Sha384 => Sha384::digest(bytes).to_vec(),
            Self::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integrity {
    pub algorithm: HashAlgorithm,
    pub digest: Vec<u8>,
}

impl Integrity {
    pub fn parse(s: &str) -> Result<Self> {
        if !INTEGRITY_RE.is_match(s) {
            return Err(XatsError::ParseError(
                "integrity",
                format!("'{s}' is not <sha256|sha384|sha512>-<base64>"),
            ));
        }
        let (name, encoded) = s.split_once('-').unwrap_or_default();
        let algorithm = HashAlgorithm::from_name(name)
            .ok_or_else(|| XatsError::ParseError("integrity", format!("unknown algorithm '{name}'")))?;
        let digest = STANDARD
            .decode(encoded)
            .map_err(|e| XatsError::ParseError("integrity", format!("'{s}': {e}")))?;
        if digest.len() != algorithm.digest_len() {
            return Err(XatsError::ParseError(
                "integrity",
                format!(
                    "'{s}': {} digest must be {} bytes, got {}",
                    algorithm.name(),
                    algorithm.digest_len(),
                    digest.len()
                ),
            ));
        }
        Ok(Self { algorithm, digest })
    }

    pub fn is_well_formed(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn compute(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest(bytes),
        }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.algorithm.digest(bytes) == self.digest
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm.name(), STANDARD.encode(&self.digest))
    }
}

/// Checks `bytes` against an expected integrity string.
pub fn verify_integrity(subject: &str, expected: &str, bytes: &[u8]) -> Result<()> {
    let integrity = Integrity::parse(expected)?;
    let actual = Integrity::compute(integrity.algorithm, bytes);
    debug!("Expected {}: {}", integrity.algorithm.name(), expected);
    debug!("Calculated {}: {} ({} bytes)", integrity.algorithm.name(), actual, bytes.len());
    if actual == integrity {
        Ok(())
    } else {
        Err(XatsError::IntegrityMismatch(
            subject.to_string(),
            format!("expected {expected}, got {actual}"),
        ))
    }
}
