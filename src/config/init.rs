use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{
    get_config_path, save_config, Config, ServiceConfig, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use crate::scoring::{Scale, ScoringConfig, Weights};

/// Models the prediction service knows about
pub const KNOWN_MODELS: [&str; 5] = ["RandomForest", "LSTM", "ARIMA", "XGBoost", "Prophet"];

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

fn validate_base_url(s: &str) -> Result<(), String> {
    if s.starts_with("http://") || s.starts_with("https://") {
        Ok(())
    } else {
        Err("must start with http:// or https://".to_string())
    }
}

/// Built-in scale by name. `custom` is only reachable through a config file.
pub fn parse_scale(s: &str) -> Result<Scale, String> {
    match s.trim().to_lowercase().as_str() {
        "crypto" => Ok(Scale::Crypto),
        "large" => Ok(Scale::Large),
        other => Err(format!("unknown scale '{}' (use crypto or large)", other)),
    }
}

/// MAE weight in [0, 1]; the MAPE weight is its complement
fn parse_mae_weight(s: &str) -> Result<Weights, String> {
    let mae: f64 = s.trim().parse().map_err(|_| "must be a number".to_string())?;
    if !(0.0..=1.0).contains(&mae) {
        return Err("must be between 0 and 1".to_string());
    }
    Ok(Weights { mae, mape: 1.0 - mae })
}

/// Match a model name case-insensitively against `KNOWN_MODELS`
fn canonical_model(s: &str) -> Option<&'static str> {
    KNOWN_MODELS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(s.trim()))
        .copied()
}

/// Write the built-in defaults to `path` (or the default location) without prompting.
pub fn write_default_config(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let config_path = path.unwrap_or_else(get_config_path);
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }
    let config = Config {
        service: ServiceConfig::default(),
        default_model: Some(DEFAULT_MODEL.to_string()),
        scoring: Some(ScoringConfig::default()),
    };
    save_config(&config_path, &config)?;
    Ok(config_path)
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    println!("bitflow configuration");
    println!("=====================");
    println!();

    // 1. Prediction service
    println!("bitflow talks to the prediction service that trains and evaluates the models.");
    let base_url = loop {
        let input = prompt_with_default("Prediction service URL", DEFAULT_BASE_URL)?;
        match validate_base_url(&input) {
            Ok(()) => break input,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };

    println!();
    println!("Training all models can take a while. Format: '30s', '2m', '5m'.");
    let timeout = loop {
        let input = prompt_with_default("Request timeout", "2m")?;
        match humantime::parse_duration(&input) {
            Ok(_) => break input,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };

    // 2. Default model
    println!();
    println!("Models: {}", KNOWN_MODELS.join(", "));
    let default_model = loop {
        let input = prompt_with_default("Model shown on the score card", DEFAULT_MODEL)?;
        match canonical_model(&input) {
            Some(m) => break m.to_string(),
            None => println!("  Unknown model '{}'. Try again.", input),
        }
    };

    // 3. Scoring
    println!();
    let configure_scoring = prompt_yes_no("Configure scoring? (n accepts defaults)", false)?;
    let scoring = if configure_scoring {
        println!();
        println!("The crypto scale grades MAE in hundreds of USD (full marks at <= 100).");
        println!("The large scale grades MAE in tens of thousands (full marks at <= 1000).");
        let scale = loop {
            let input = prompt_with_default("Scale (crypto/large)", "crypto")?;
            match parse_scale(&input) {
                Ok(s) => break s,
                Err(e) => println!("  Invalid: {}. Try again.", e),
            }
        };

        println!();
        println!("The final score is a weighted sum of the MAE and MAPE sub-scores.");
        let weights = loop {
            let input = prompt_with_default("MAE weight (MAPE gets the rest)", "0.4")?;
            match parse_mae_weight(&input) {
                Ok(w) => break w,
                Err(e) => println!("  Invalid: {}. Try again.", e),
            }
        };

        ScoringConfig {
            scale: Some(scale),
            weights: Some(weights),
            mae_table: None,
            mape_table: None,
        }
    } else {
        ScoringConfig::default()
    };

    // 4. Config path
    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    // 5. Write config
    let config = Config {
        service: ServiceConfig {
            base_url,
            timeout: Some(timeout),
        },
        default_model: Some(default_model),
        scoring: Some(scoring),
    };
    save_config(&config_path, &config)?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Run `bitflow predict --start YYYY-MM-DD --end YYYY-MM-DD` to get started.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::env;

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("http://127.0.0.1:5000").is_ok());
        assert!(validate_base_url("https://models.example.com").is_ok());
        assert!(validate_base_url("127.0.0.1:5000").is_err());
    }

    #[test]
    fn test_parse_scale() {
        assert_eq!(parse_scale("Crypto"), Ok(Scale::Crypto));
        assert_eq!(parse_scale(" large "), Ok(Scale::Large));
        assert!(parse_scale("custom").is_err());
    }

    #[test]
    fn test_parse_mae_weight() {
        let w = parse_mae_weight("0.25").unwrap();
        assert_eq!(w.mae, 0.25);
        assert_eq!(w.mape, 0.75);
        assert!(parse_mae_weight("1.5").is_err());
        assert!(parse_mae_weight("heavy").is_err());
    }

    #[test]
    fn test_canonical_model() {
        assert_eq!(canonical_model("xgboost"), Some("XGBoost"));
        assert_eq!(canonical_model("lstm"), Some("LSTM"));
        assert_eq!(canonical_model("svm"), None);
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let path = env::temp_dir().join("bitflow_test_init").join("config.yaml");
        let _ = std::fs::remove_file(&path);

        let written = write_default_config(Some(path.clone()), false).unwrap();
        assert_eq!(written, path);
        assert!(write_default_config(Some(path.clone()), false).is_err());
        assert!(write_default_config(Some(path.clone()), true).is_ok());

        let config = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert_eq!(config.scoring, Some(ScoringConfig::default()));

        let _ = std::fs::remove_file(&path);
    }
}
