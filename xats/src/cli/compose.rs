use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use xats_aio::read_json_async;
use xats_common::config::Config;
use xats_common::error::Result;
use xats_core::CompositionResolver;

use super::{failed, interrupt_signal, print_json};

#[derive(Args, Debug)]
pub struct Compose {
    /// Root document (JSON)
    pub document: PathBuf,

    /// Directory fragments are confined to [default: the document's directory]
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Compose N times and report timings instead of the document
    #[arg(long, value_name = "N")]
    pub bench: Option<usize>,
}

impl Compose {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let root: Value = read_json_async(&self.document).await?;
        let base = match &self.base {
            Some(base) => base.clone(),
            None => self
                .document
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        };
        let resolver = CompositionResolver::from_config(config);
        let cancel = interrupt_signal();

        if let Some(iterations) = self.bench {
            let report = resolver
                .benchmark(&root, &base, &config.limits, iterations, &cancel)
                .await;
            print_json(&report)?;
            return failed(report.last_error_count, "fragment references");
        }

        let result = resolver
            .resolve_fragments(&root, &base, &config.limits, &cancel)
            .await;
        print_json(&result)?;
        failed(result.errors.len(), "fragment references")
    }
}
