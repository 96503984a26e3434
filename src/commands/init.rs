/*!
 * Init command: write a starter configuration file
 *
 * Asks which column to sort by, which host to use and where to put the
 * downloads, then saves the result as TOML. With `--defaults` nothing is
 * asked and the stock configuration is written.
 */

use std::path::{Path, PathBuf};

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::config::{CategoryPreset, HarvestConfig};
use crate::error::{HarvestError, Result};

const PRESETS: &[(CategoryPreset, &str)] = &[
    (CategoryPreset::Type, "Document type (\"Type\" column)"),
    (CategoryPreset::Agenda, "Agenda item (\"Agenda item\" column)"),
];

/// Write a configuration file to `target` (or the default location)
pub fn run_init(target: Option<&Path>, use_defaults: bool) -> Result<PathBuf> {
    let config_path = match target {
        Some(path) => path.to_path_buf(),
        None => HarvestConfig::default_path().ok_or_else(|| {
            HarvestError::Config("Could not determine the user configuration directory".to_string())
        })?,
    };

    let theme = ColorfulTheme::default();

    if config_path.exists() {
        let overwrite = !use_defaults
            && Confirm::with_theme(&theme)
                .with_prompt(format!(
                    "{} already exists. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;
        if !overwrite {
            println!("\n{}", style("Configuration unchanged.").cyan());
            return Ok(config_path);
        }
    }

    let config = if use_defaults {
        HarvestConfig::default()
    } else {
        interview(&theme)?
    };
    config.validate()?;
    config.to_file(&config_path)?;

    print_summary(&config_path, &config);
    Ok(config_path)
}

fn interview(theme: &ColorfulTheme) -> Result<HarvestConfig> {
    let defaults = HarvestConfig::default();

    let labels: Vec<&str> = PRESETS.iter().map(|(_, label)| *label).collect();
    let selection = Select::with_theme(theme)
        .with_prompt("Sort archives by")
        .default(0)
        .items(&labels)
        .interact()?;

    let host: String = Input::with_theme(theme)
        .with_prompt("Archive host")
        .default(defaults.host.clone())
        .interact_text()?;

    let output_dir: String = Input::with_theme(theme)
        .with_prompt("Download directory")
        .default(defaults.output_dir.display().to_string())
        .interact_text()?;

    let preset = PRESETS
        .get(selection)
        .map(|(preset, _)| *preset)
        .unwrap_or_default();
    Ok(build_config(preset, host, PathBuf::from(output_dir)))
}

/// Default configuration with the interview answers applied
pub fn build_config(preset: CategoryPreset, host: String, output_dir: PathBuf) -> HarvestConfig {
    HarvestConfig {
        host,
        output_dir,
        category_column: preset.column().to_string(),
        ..Default::default()
    }
}

fn print_summary(config_path: &Path, config: &HarvestConfig) {
    println!();
    println!("  {} Configuration saved", style("✓").green().bold());
    println!("  Location: {}", style(config_path.display()).cyan());
    println!();
    println!("  Host:             {}", style(&config.host).yellow());
    println!(
        "  Sort by column:   {}",
        style(&config.category_column).yellow()
    );
    println!(
        "  Downloads:        {}",
        style(config.output_dir.display()).yellow()
    );
    println!();
    println!(
        "  Run '{}' to start a harvest.",
        style("tdoc-harvest").bold()
    );
    println!();
}
