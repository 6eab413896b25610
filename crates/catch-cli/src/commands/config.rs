//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use catch_core::{Config, Locale};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "sync_url": config.sync_url,
                    "sync_enabled": config.sync_enabled,
                    "collection": config.collection,
                    "locale": config.locale,
                    "relay_bind": config.relay_bind,
                    "log_file": config.log_file,
                    "last_store": config.last_store
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:     {}", config.data_dir.display());
            println!(
                "  sync_url:     {}",
                config.sync_url.as_deref().unwrap_or("(not set)")
            );
            println!("  sync_enabled: {}", config.sync_enabled);
            println!("  collection:   {}", config.collection);
            println!("  locale:       {}", config.locale);
            println!("  relay_bind:   {}", config.relay_bind);
            println!(
                "  log_file:     {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  last_store:   {}",
                config.last_store.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    // Edit the file itself; CATCH_* overrides stay out of it
    let path = Config::file_path(config_path);
    Config::update_file(&path, |config| apply(config, &key, &value))
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "sync_url" => {
            config.sync_url = optional(value);
        }
        "sync_enabled" => {
            config.sync_enabled = value
                .parse()
                .context("Invalid value for sync_enabled. Use 'true' or 'false'.")?;
        }
        "collection" => {
            if value.is_empty() || value.contains('/') {
                bail!("Invalid collection '{}': must be a single path segment", value);
            }
            config.collection = value.to_string();
        }
        "locale" => {
            let locale: Locale = value.parse()?;
            config.locale = locale.tag().to_string();
        }
        "relay_bind" => {
            config.relay_bind = value.to_string();
        }
        "log_file" => {
            config.log_file = optional(value).map(Into::into);
        }
        "last_store" => {
            config.last_store = match optional(value) {
                Some(store) => Some(catch_core::StoreId::parse(&store)?.to_string()),
                None => None,
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, sync_url, sync_enabled, collection, locale, \
                 relay_bind, log_file, last_store",
                key
            );
        }
    }

    Ok(())
}

/// Empty or "none" clears an optional setting
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "sync_url", "ws://127.0.0.1:3030").unwrap();
        apply(&mut config, "sync_enabled", "true").unwrap();
        apply(&mut config, "locale", "de-de").unwrap();
        assert_eq!(config.relay_url(), Some("ws://127.0.0.1:3030"));
        assert_eq!(config.locale, "de-DE");

        apply(&mut config, "sync_url", "none").unwrap();
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "sync_enabled", "maybe").is_err());
        assert!(apply(&mut config, "locale", "xx-XX").is_err());
        assert!(apply(&mut config, "last_store", "a/b").is_err());
        assert!(apply(&mut config, "colour", "red").is_err());
        assert_eq!(config.locale, Config::default().locale);
    }

    #[test]
    fn test_set_writes_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", dir.path().join("data").display().to_string()),
        )
        .unwrap();

        let output = Output::new(OutputFormat::Quiet);
        set(
            "last_store".to_string(),
            "blue-whale".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.last_store.as_deref(), Some("blue-whale"));
    }
}
