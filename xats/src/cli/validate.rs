use std::path::PathBuf;

use clap::{Args, ValueEnum};
use colored::Colorize;
use serde_json::Value;
use xats_aio::read_json_async;
use xats_common::config::Config;
use xats_common::error::{Result, XatsError};
use xats_common::validation::{validate_cache, validate_limits_value, validate_registry};

use super::print_json;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKind {
    Registry,
    Cache,
    Limits,
}

#[derive(Args, Debug)]
pub struct Validate {
    #[arg(value_enum)]
    pub kind: ConfigKind,
    pub file: PathBuf,
}

impl Validate {
    pub async fn run(&self, _config: &Config) -> Result<()> {
        let value: Value = read_json_async(&self.file).await?;
        let report = match self.kind {
            ConfigKind::Registry => validate_registry(&value),
            ConfigKind::Cache => validate_cache(&value),
            ConfigKind::Limits => validate_limits_value(&value),
        };
        for warning in &report.warnings {
            eprintln!("{} {}", "Warning:".yellow().bold(), warning);
        }
        print_json(&report)?;
        if report.valid {
            Ok(())
        } else {
            Err(XatsError::ValidationError(format!(
                "{} has {} error(s)",
                self.file.display(),
                report.errors.len()
            )))
        }
    }
}
