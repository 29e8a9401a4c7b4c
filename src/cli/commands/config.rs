use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a default global config file")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(),
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path =
        Config::global_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Global config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::init_global().context("failed to create global config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created global config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let resolved = Config::load()?;

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": resolved.config,
            "loaded_from": resolved.loaded_from,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolved.loaded_from {
        Some(ref path) => println!("# Loaded from: {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    println!();
    print!(
        "{}",
        toml::to_string_pretty(&resolved.config).context("failed to render config")?
    );
    Ok(())
}

fn handle_path() -> Result<()> {
    let project = Config::project_path();
    let global = Config::global_path();

    println!("Configuration paths (first existing wins):");
    println!();
    for (label, path) in [("Project", project), ("Global", global)] {
        if let Some(path) = path {
            let state = if path.exists() { "active" } else { "absent" };
            println!("{} config ({}): {}", label, state, path.display());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        }
    }

    Ok(())
}
