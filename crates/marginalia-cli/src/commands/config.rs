//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use marginalia_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.vault_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  vault_dir:         {}", config.vault_dir.display());
            println!("  highlights_folder: {}", config.highlights_folder);
            println!("  insights_folder:   {}", config.insights_folder);
            println!("  kobo_db:           {}", display_optional(&config.kobo_db));
            println!("  sort_order:        {}", config.sort_order);
            println!("  import_all_books:  {}", config.import_all_books);
            println!("  log_file:          {}", display_optional(&config.log_file));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: &str, value: &str, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    let mut config = Config::load_from_path(&save_path).context("Failed to load configuration")?;

    config.set(key, value)?;
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
