// xats-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::UserDirs;
use tracing::debug;

use super::cache::DEFAULT_TTL;
use super::error::{Result, XatsError};
use super::model::{CompositionLimits, RegistryConfig};
use super::validation::{parse_registry_config, validate_limits};

const XATS_HOME_DIRNAME: &str = ".xats";
const REGISTRIES_FILENAME: &str = "registries.json";
const MAX_DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub xats_home: PathBuf,
    pub registries_path: PathBuf,
    /// Fan-out limit for batch resolution and composition.
    pub concurrency: usize,
    pub limits: CompositionLimits,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading xats configuration");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let xats_home = get("XATS_HOME").map(PathBuf::from).unwrap_or_else(|| {
            let home = UserDirs::new()
                .map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf());
            home.join(XATS_HOME_DIRNAME)
        });
        debug!("Effective XATS_HOME set to: {}", xats_home.display());

        let registries_path = get("XATS_REGISTRIES")
            .map(PathBuf::from)
            .unwrap_or_else(|| xats_home.join(REGISTRIES_FILENAME));

        let concurrency = match get("XATS_CONCURRENCY") {
            Some(raw) => parse_number::<usize>("XATS_CONCURRENCY", &raw)?.max(1),
            None => default_concurrency(),
        };

        let mut limits = CompositionLimits::default();
        if let Some(raw) = get("XATS_MAX_FILE_SIZE") {
            limits.max_file_size = parse_number("XATS_MAX_FILE_SIZE", &raw)?;
        }
        if let Some(raw) = get("XATS_MAX_TOTAL_FILES") {
            limits.max_total_files = parse_number("XATS_MAX_TOTAL_FILES", &raw)?;
        }
        if let Some(raw) = get("XATS_MAX_DEPTH") {
            limits.max_depth = parse_number("XATS_MAX_DEPTH", &raw)?;
        }
        let report = validate_limits(&limits);
        if !report.valid {
            return Err(XatsError::Config(report.errors.join("; ")));
        }

        let cache_ttl = match get("XATS_CACHE_TTL") {
            Some(raw) => humantime::parse_duration(&raw)
                .map_err(|e| XatsError::Config(format!("XATS_CACHE_TTL '{raw}': {e}")))?,
            None => DEFAULT_TTL,
        };

        debug!("Configuration loaded successfully.");
        Ok(Self {
            xats_home,
            registries_path,
            concurrency,
            limits,
            cache_ttl,
        })
    }

    pub fn xats_home(&self) -> &Path {
        &self.xats_home
    }

    pub fn registries_path(&self) -> &Path {
        &self.registries_path
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.xats_home.join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.xats_home.join("logs")
    }

    /// Reads and validates the configured registry file.
    pub fn load_registries(&self) -> Result<RegistryConfig> {
        load_registries(&self.registries_path)
    }
}

/// Physical cores minus one, clamped to a small range.
pub fn default_concurrency() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(MAX_DEFAULT_CONCURRENCY)
}

pub fn load_registries(path: &Path) -> Result<RegistryConfig> {
    debug!("Loading registries from {}", path.display());
    let raw = fs::read_to_string(path).map_err(|e| {
        XatsError::Config(format!(
            "Failed to read registry file {}: {e}",
            path.display()
        ))
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    parse_registry_config(&value)
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| XatsError::Config(format!("{key} '{raw}': {e}")))
}
