//! `swb` -- CLI binary for switchboard.
//!
//! Provides the following subcommands:
//!
//! - `swb providers` -- List configured providers and their readiness.
//! - `swb models` -- List the models a provider offers.
//! - `swb test` -- Check connectivity for one or all providers.
//! - `swb ask` -- Send a prompt through the fallback chain.

use clap::{Parser, Subcommand};

mod commands;

/// Multi-vendor LLM switchboard CLI.
#[derive(Parser)]
#[command(name = "swb", about = "Multi-vendor LLM switchboard CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List configured providers.
    Providers(commands::providers::ProvidersArgs),

    /// List the models a provider offers.
    Models(commands::models::ModelsArgs),

    /// Check connectivity for one or all providers.
    Test(commands::test::TestArgs),

    /// Send a prompt through the fallback chain.
    Ask(commands::ask::AskArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Providers(args) => commands::providers::run(args)?,
        Commands::Models(args) => commands::models::run(args).await?,
        Commands::Test(args) => commands::test::run(args).await?,
        Commands::Ask(args) => commands::ask::run(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_flags() {
        let cli = Cli::try_parse_from(["swb", "-v", "ask", "hello", "--stream", "--provider", "claude"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.prompt, "hello");
                assert!(args.stream);
                assert_eq!(args.provider.as_deref(), Some("claude"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_id_is_optional() {
        let cli = Cli::try_parse_from(["swb", "test"]).unwrap();
        match cli.command {
            Commands::Test(args) => assert!(args.id.is_none()),
            _ => panic!("expected test"),
        }
    }

    #[test]
    fn models_requires_id() {
        assert!(Cli::try_parse_from(["swb", "models"]).is_err());
    }
}
