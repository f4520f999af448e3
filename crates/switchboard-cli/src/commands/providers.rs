//! `swb providers` -- list configured providers.

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use serde_json::json;
use switchboard_llm::ProviderRegistry;

use super::load_registry;

/// Arguments for the `providers` subcommand.
#[derive(Args)]
pub struct ProvidersArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ProvidersArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.config.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&registry))?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    println!("{}", render_table(&registry));
    Ok(())
}

fn render_table(registry: &ProviderRegistry) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["", "ID", "NAME", "TYPE", "ENABLED", "READY", "ORDER"]);

    for config in registry.configs() {
        let active = if registry.active_id() == Some(config.id.as_str()) {
            "*"
        } else {
            ""
        };
        table.add_row([
            active.to_string(),
            config.id.clone(),
            config.name.clone(),
            config.kind.to_string(),
            yes_no(config.enabled).to_string(),
            yes_no(registry.is_ready(&config.id)).to_string(),
            config.order.to_string(),
        ]);
    }
    table
}

fn to_json(registry: &ProviderRegistry) -> serde_json::Value {
    let providers: Vec<_> = registry
        .configs()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "type": c.kind,
                "enabled": c.enabled,
                "ready": registry.is_ready(&c.id),
                "order": c.order,
            })
        })
        .collect();
    json!({
        "activeProviderId": registry.active_id(),
        "providers": providers,
    })
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
