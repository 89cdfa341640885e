//! Configuration file support for vexkit.
//!
//! Provides YAML-based configuration through `vexkit.config.yml` files,
//! carrying generation defaults (author, context, default status and
//! justification) so CI pipelines do not have to repeat them as flags.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::generator::GeneratorConfig;
use crate::model::{Justification, Status};
use crate::shared::Result;

const CONFIG_FILENAME: &str = "vexkit.config.yml";

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub author: Option<String>,
    pub context: Option<String>,
    pub default_status: Option<String>,
    pub default_justification: Option<String>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

impl ConfigFile {
    /// Fold these file-level defaults into a generator config; explicit
    /// values already present in `config` win.
    pub fn apply_to(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if config.context.is_none() {
            config.context = self.context.clone();
        }
        if config.default_status.is_none() {
            config.default_status = self
                .default_status
                .as_deref()
                .and_then(|s| Status::from_str(s).ok());
        }
        if config.default_justification.is_none() {
            config.default_justification = self
                .default_justification
                .as_deref()
                .and_then(|s| Justification::from_str(s).ok());
        }
        config
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(ref status) = config.default_status {
        if Status::from_str(status).is_err() {
            bail!(
                "Invalid config: default_status '{}' is not a VEX status.\n\n\
                 💡 Hint: Use one of not_affected, affected, fixed, under_investigation.",
                status
            );
        }
    }
    if let Some(ref justification) = config.default_justification {
        if Justification::from_str(justification).is_err() {
            bail!(
                "Invalid config: default_justification '{}' is not a VEX justification.\n\n\
                 💡 Hint: Use one of the OpenVEX justification codes (e.g., component_not_present).",
                justification
            );
        }
    }
    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(
            &config_path,
            r#"
author: Acme PSIRT
context: https://acme.example/ns
default_status: under_investigation
default_justification: component_not_present
"#,
        )
        .unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.author.as_deref(), Some("Acme PSIRT"));
        assert_eq!(config.context.as_deref(), Some("https://acme.example/ns"));
        assert_eq!(
            config.default_status.as_deref(),
            Some("under_investigation")
        );
    }

    #[test]
    fn test_apply_to_keeps_explicit_values() {
        let file = ConfigFile {
            author: Some("Acme PSIRT".to_string()),
            context: Some("https://acme.example/ns".to_string()),
            default_status: Some("affected".to_string()),
            default_justification: None,
            unknown_fields: HashMap::new(),
        };

        let mut explicit = GeneratorConfig::new("CLI Author");
        explicit.default_status = Some(Status::Fixed);
        let merged = file.apply_to(explicit);
        assert_eq!(merged.author, "CLI Author");
        assert_eq!(merged.default_status, Some(Status::Fixed));
        assert_eq!(merged.context.as_deref(), Some("https://acme.example/ns"));
    }

    #[test]
    fn test_discover_config_found() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "author: Security Team\n",
        )
        .unwrap();

        let config = discover_config(dir.path()).unwrap();
        assert!(config.is_some());
        assert_eq!(config.unwrap().author.as_deref(), Some("Security Team"));
    }

    #[test]
    fn test_discover_config_not_found() {
        let dir = TempDir::new().unwrap();
        let config = discover_config(dir.path()).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config_from_path(Path::new("/nonexistent/config.yml"));
        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("bad.yml");
        fs::write(&config_path, "invalid: yaml: [[[broken").unwrap();

        let result = load_config_from_path(&config_path);
        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_default_status() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "default_status: exploited\n").unwrap();

        let result = load_config_from_path(&config_path);
        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("not a VEX status"));
    }

    #[test]
    fn test_unknown_fields_captured() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(
            &config_path,
            "author: Security Team\nunknown_field: true\n",
        )
        .unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.unknown_fields.len(), 1);
        assert!(config.unknown_fields.contains_key("unknown_field"));
    }
}
