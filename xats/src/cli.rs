// xats/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use xats_common::error::{Result, XatsError};
use xats_common::{cancel_pair, CancelSignal, Config};

pub mod compose;
pub mod deps;
pub mod resolve;
pub mod validate;

use crate::cli::compose::Compose;
use crate::cli::deps::Deps;
use crate::cli::resolve::Resolve;
use crate::cli::validate::Validate;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "xats", bin_name = "xats")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve package references against the configured registries
    Resolve(Resolve),
    /// Build the dependency graph of a package version
    Deps(Deps),
    /// Expand fragment references in a document
    Compose(Compose),
    /// Check a configuration file
    Validate(Validate),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Resolve(command) => command.run(config).await,
            Self::Deps(command) => command.run(config).await,
            Self::Compose(command) => command.run(config).await,
            Self::Validate(command) => command.run(config).await,
        }
    }
}

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A signal that fires on Ctrl-C.
pub(crate) fn interrupt_signal() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight work");
            handle.cancel();
        }
    });
    signal
}

pub(crate) fn failed(count: usize, what: &str) -> Result<()> {
    if count == 0 {
        Ok(())
    } else {
        Err(XatsError::Generic(format!("{count} {what} failed")))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_well_formed() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let args = CliArgs::parse_from(["xats", "-vv", "compose", "book.json", "--bench", "5"]);
        assert_eq!(args.verbose, 2);
        let Command::Compose(compose) = args.command else {
            panic!("expected compose");
        };
        assert_eq!(compose.bench, Some(5));
        assert_eq!(compose.base, None);

        let args = CliArgs::parse_from(["xats", "validate", "cache", "cache.json"]);
        assert!(matches!(
            args.command,
            Command::Validate(ref v) if v.kind == validate::ConfigKind::Cache
        ));
        assert!(CliArgs::try_parse_from(["xats", "resolve"]).is_err());
    }
}
