//! `switchboard route TEXT`: show where a message would go, without running it.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use switchboard_core::config::Config;
use switchboard_router::CommandParser;

use crate::app::{build_registry, build_router};

/// Run the route command.
pub async fn run(config: &Config, text: &str) -> Result<()> {
    let registry = Arc::new(build_registry(config)?);
    let router = build_router(config, registry.clone());
    let parsed = CommandParser::default().parse_command(text);

    println!();
    println!("  {:<12} {}", "Explicit:".bold(), parsed.explicit);
    if parsed.explicit {
        println!(
            "  {:<12} {}/{}",
            "Prefix:".bold(),
            parsed.provider,
            parsed.execution_layer
        );
    }
    println!("  {:<12} {:?}", "Message:".bold(), parsed.message);

    match router.resolve(&parsed).await {
        Ok(route) => {
            let name = registry
                .get_executor_metadata(&route.target.provider, route.target.layer)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| route.executor.provider_name());
            println!("  {:<12} {} ({})", "Target:".bold(), route.target.to_string().green(), name);
            if route.is_fallback() {
                println!(
                    "  {:<12} {} unavailable, substituted",
                    "Fallback:".bold(),
                    route.preferred.to_string().yellow()
                );
            }
        }
        Err(e) => {
            println!("  {:<12} {}", "Target:".bold(), "unavailable".red());
            println!("  {:<12} {}", "Reason:".bold(), e);
        }
    }
    println!();
    Ok(())
}
