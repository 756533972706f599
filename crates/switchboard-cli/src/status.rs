//! `switchboard status`: show configuration and whether it is valid.
//!
//! With `--init`, writes a default config first if none exists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use switchboard_core::config::{get_config_path, load_config, save_config, Config};

use crate::helpers::mark;

/// Run the status command.
pub fn run(config_path: Option<&Path>, init: bool) -> Result<()> {
    let path: PathBuf = config_path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    println!();
    println!("{}", "📡 Switchboard Status".cyan().bold());
    println!();

    if init {
        if init_config(&path)? {
            println!("  {} created config at {}", "✓".green(), path.display());
        } else {
            println!("  {} config already exists at {}", "✓".green(), path.display());
        }
        println!();
    }

    let exists = path.exists();
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if exists {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    let config = load_config(Some(&path));
    match config.validate() {
        Ok(()) => println!("  {:<18} {}", "Validation:".bold(), "ok".green()),
        Err(e) => {
            println!("  {:<18} {}", "Validation:".bold(), "failed".red());
            for problem in &e.0 {
                println!("    - {problem}");
            }
        }
    }

    print_settings(&config);
    println!();
    Ok(())
}

/// Write the default config to `path` unless one exists. Returns whether it wrote.
fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

fn print_settings(config: &Config) {
    let routing = &config.routing;
    println!();
    println!("  {}", "Routing:".bold());
    println!(
        "    {:<20} {}/{}",
        "default",
        routing.default_provider,
        routing.default_layer
    );
    println!(
        "    {:<20} {}",
        "default CLI",
        routing
            .default_cli_provider
            .as_deref()
            .unwrap_or(&routing.default_provider)
    );
    println!(
        "    {:<20} {}",
        "fallback",
        format!("{:?}", routing.fallback).to_lowercase()
    );
    println!(
        "    {:<20} {}",
        "AI classification",
        mark(routing.use_ai_intent_classification)
    );
    if let Some(instruction) = routing.language_instruction() {
        println!("    {:<20} {}", "language", instruction.dimmed());
    }

    let sessions = &config.sessions;
    println!();
    println!("  {}", "Sessions:".bold());
    println!("    {:<20} {}", "store", sessions.storage_path().display());
    println!("    {:<20} {}", "max messages", sessions.max_messages);
    println!("    {:<20} {}s", "timeout", sessions.timeout_secs);
    println!("    {:<20} {}s", "sweep interval", sessions.sweep_interval_secs);
    println!("    {:<20} {}", "dedup capacity", config.dedup.capacity);

    println!();
    println!("  {}", "Executors:".bold());
    if let Some(meta) = &config.executors.metadata_path {
        println!("    {:<20} {}", "metadata", meta);
    }
    if config.executors.commands.is_empty() {
        println!("    {}", "· none configured".dimmed());
    }
    for cmd in &config.executors.commands {
        println!(
            "    {:<20} {}",
            format!("{}/{}", cmd.provider, cmd.layer),
            cmd.program.dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert!(init_config(&path).unwrap());
        assert!(path.exists());
        assert!(!init_config(&path).unwrap());

        let loaded = load_config(Some(&path));
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.routing.default_provider, "claude");
    }
}
