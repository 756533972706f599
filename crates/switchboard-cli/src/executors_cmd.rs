//! `switchboard executors`: registered executors, metadata, availability.

use anyhow::Result;
use colored::Colorize;

use switchboard_core::config::Config;
use switchboard_core::types::ExecutionLayer;

use crate::app::build_registry;
use crate::helpers::mark;

/// Run the executors command.
pub fn run(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;

    println!();
    println!("{}", "📡 Executors".cyan().bold());

    for layer in ExecutionLayer::ALL {
        println!();
        println!("  {}", format!("{} layer", layer.as_str().to_uppercase()).bold());
        let executors = registry.executors(layer);
        if executors.is_empty() {
            println!("    {}", "· none registered".dimmed());
            continue;
        }
        for (provider, _) in executors {
            let available = registry.is_executor_available(&provider, layer);
            let name = registry
                .get_executor_metadata(&provider, layer)
                .map(|m| m.name.clone())
                .unwrap_or_default();
            let status = match registry.get_executor(&provider, layer) {
                Ok(_) => "available".green().to_string(),
                Err(e) => e.reason.red().to_string(),
            };
            println!("    {} {:<10} {:<24} {}", mark(available), provider, name, status);
        }
    }

    // Metadata with no handle behind it, e.g. from a bootstrap file.
    let orphans: Vec<_> = registry
        .all_metadata()
        .into_iter()
        .filter(|m| registry.executors(m.layer).iter().all(|(p, _)| p != &m.provider))
        .collect();
    if !orphans.is_empty() {
        println!();
        println!("  {}", "Metadata without executor".bold());
        for m in orphans {
            println!(
                "    {:<16} {:<24} v{} prio {}",
                format!("{}/{}", m.provider, m.layer),
                m.name,
                m.version,
                m.priority
            );
        }
    }

    let available = registry.list_available_executors(None);
    println!();
    println!(
        "  {} available: {}",
        available.len(),
        available.into_iter().collect::<Vec<_>>().join(", ")
    );
    println!();
    Ok(())
}
