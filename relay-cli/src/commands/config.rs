use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use shared::config::Config;

#[derive(Args, Debug)]
#[command(about = "Inspect or scaffold the configuration file")]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Write a default configuration file if none exists
    Init,
}

pub fn handle(config: &Config, path_override: Option<PathBuf>, args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => show(config),
        ConfigAction::Init => init(path_override),
    }
}

fn show(config: &Config) -> Result<()> {
    // Never echo the credential itself.
    let mut display = config.clone();
    if display.api_token.is_some() {
        display.api_token = Some("<set>".to_string());
    }
    let rendered = toml::to_string_pretty(&display).context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}

fn init(path_override: Option<PathBuf>) -> Result<()> {
    let path = match path_override {
        Some(path) => path,
        None => Config::default_path().context("no configuration directory available")?,
    };
    if path.exists() {
        println!("Configuration already exists at {}.", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let rendered = toml::to_string_pretty(&Config::with_defaults())
        .context("failed to render default configuration")?;
    fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}.", path.display());
    Ok(())
}
