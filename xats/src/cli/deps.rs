use clap::Args;
use xats_common::config::Config;
use xats_common::dependency::resolve_dependencies;
use xats_common::error::Result;

use super::{failed, print_json};

#[derive(Args, Debug)]
pub struct Deps {
    pub package: String,
    /// Exact version, or `latest`
    #[arg(id = "package_version", value_name = "VERSION", default_value = "latest")]
    pub version: String,
}

impl Deps {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let registries = config.load_registries()?;
        let resolution = resolve_dependencies(&self.package, &self.version, &registries);
        for conflict in &resolution.conflicts {
            tracing::warn!(
                "{} resolves to {} different versions",
                conflict.package,
                conflict.requests.len()
            );
        }
        print_json(&resolution)?;
        failed(resolution.errors.len(), "dependencies")
    }
}
