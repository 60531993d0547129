//! Configuration management commands.

use anyhow::{Result, bail};
use gridkit_config::GridkitConfig;

use crate::style::{print_header, print_labeled, print_spacer};

/// Show the effective configuration.
pub fn show(config: &GridkitConfig, format: &str) -> Result<()> {
    match format {
        "toml" => print!("{}", config.to_toml()?),
        "json" => println!("{}", serde_json::to_string_pretty(config)?),
        "text" => {
            print_header("Gridkit Configuration");
            print_spacer();

            println!("Query:");
            print_labeled("UTC offset", &config.query.utc_offset);
            print_labeled("Default take", &config.query.default_take.to_string());
            print_spacer();

            println!("Output:");
            print_labeled("Pretty", &config.output.pretty.to_string());
            print_spacer();

            println!("Logging:");
            print_labeled("Level", &config.logging.level);
        }
        other => bail!("unknown format {other:?} (expected toml|json|text)"),
    }
    Ok(())
}

/// Validate the effective configuration.
pub fn validate(config: &GridkitConfig) -> Result<()> {
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}
