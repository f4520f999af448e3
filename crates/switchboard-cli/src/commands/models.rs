//! `swb models <id>` -- list the models a provider offers.

use clap::Args;

use super::load_registry;

/// Arguments for the `models` subcommand.
#[derive(Args)]
pub struct ModelsArgs {
    /// Provider id.
    pub id: String,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

pub async fn run(args: ModelsArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.config.as_deref())?;
    let Some(provider) = registry.get(&args.id) else {
        anyhow::bail!("unknown provider: {}", args.id);
    };

    for model in provider.available_models().await {
        println!("{model}");
    }
    Ok(())
}
