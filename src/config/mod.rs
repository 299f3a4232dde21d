pub mod init;
mod schema;

pub use schema::{Config, ServiceConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/bitflow/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("bitflow")
}

/// Get the default config file path (~/.config/bitflow/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Ensure the parent directory of `path` exists
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory at {}", dir.display())
            })?;
        }
    }
    Ok(())
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   (~/.config/bitflow/config.yaml) and falls back to built-in defaults when
///   that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse config: invalid YAML in {}",
            config_path.display()
        )
    })?;

    Ok(config)
}

/// Write `config` as YAML to `path` atomically, creating the directory if needed
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    ensure_parent_dir(path)?;

    let yaml = serde_saphyr::to_string(config).context("Failed to serialize config")?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(yaml.as_bytes())
        .context("Failed to write config")?;
    file.commit().context("Failed to save config")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Scale, ScoringConfig};
    use std::env;

    #[test]
    fn test_missing_explicit_path_is_error() {
        let path = env::temp_dir().join("bitflow_test_no_such_config.yaml");
        let _ = fs::remove_file(&path);
        assert!(load_config(Some(path)).is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let path = env::temp_dir().join("bitflow_test_full_config.yaml");
        fs::write(
            &path,
            r#"
service:
  base_url: "http://localhost:5050"
  timeout: "30s"
default_model: LSTM
scoring:
  scale: large
"#,
        )
        .unwrap();

        let config = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.service.base_url, "http://localhost:5050");
        assert_eq!(config.service.timeout.as_deref(), Some("30s"));
        assert_eq!(config.default_model(), "LSTM");
        assert_eq!(config.scoring.unwrap().scale, Some(Scale::Large));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_empty_sections_use_defaults() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert!(config.scoring.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_saphyr::from_str::<Config>("queries: []").is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = env::temp_dir().join("bitflow_test_cfg_dir").join("config.yaml");
        let _ = fs::remove_file(&path);

        let config = Config {
            service: ServiceConfig {
                base_url: "http://10.0.0.2:5000".to_string(),
                timeout: None,
            },
            default_model: Some("Prophet".to_string()),
            scoring: Some(ScoringConfig::default()),
        };
        save_config(&path, &config).unwrap();

        let loaded = load_config(Some(path.clone())).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_file(&path);
    }
}
