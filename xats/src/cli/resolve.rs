use std::sync::Arc;

use clap::Args;
use xats_common::config::Config;
use xats_common::error::Result;
use xats_common::MemoryResolutionCache;
use xats_core::RegistryResolver;

use super::{failed, interrupt_signal, print_json};

#[derive(Args, Debug)]
pub struct Resolve {
    /// References of the form xats://registry/package[@version][/path]
    #[arg(required = true)]
    pub references: Vec<String>,
}

impl Resolve {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let registries = config.load_registries()?;
        let resolver = RegistryResolver::from_config(config, registries)
            .with_cache(Arc::new(MemoryResolutionCache::new(config.cache_ttl)));
        let batch = resolver
            .resolve_many(&self.references, &interrupt_signal())
            .await;
        print_json(&batch)?;
        failed(batch.errors.len(), "references")
    }
}
