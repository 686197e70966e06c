//! Persistent configuration handling for PixelMood.
//!
//! Persists configuration in a JSON file:
//! `~/.config/pixelmood/config.json`.
//!
//! The file is resolved into [`Settings`] once per command, with environment overrides applied,
//! and the relevant parts are handed to the pipeline explicitly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::inference::Endpoint;
use crate::pipeline::{PipelineConfig, DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_MIN_LINE_LENGTH};

const APP_CONFIG_DIR_NAME: &str = "pixelmood";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference";
pub const DEFAULT_OCR_MODEL: &str = "Salesforce/blip-image-captioning-large";
pub const DEFAULT_SENTIMENT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Checked in order; the first non-empty one wins over the config file.
pub const API_KEY_ENV_VARS: [&str; 2] = ["PIXELMOOD_API_KEY", "HUGGINGFACE_API_KEY"];
pub const INFERENCE_URL_ENV_VAR: &str = "PIXELMOOD_INFERENCE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Directive for `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// On-disk shape. Every key is optional; missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_line_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_dimension: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl RawConfig {
    fn normalized(mut self) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        self.api_key = non_empty(self.api_key);
        self.inference_url = non_empty(self.inference_url);
        self.ocr_model = non_empty(self.ocr_model);
        self.sentiment_model = non_empty(self.sentiment_model);
        self.log_level = non_empty(self.log_level);
        self
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub inference_url: String,
    pub ocr_model: String,
    pub sentiment_model: String,
    pub min_line_length: usize,
    pub request_timeout: Duration,
    pub max_image_dimension: u32,
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(RawConfig::default(), |_| None)
    }
}

impl Settings {
    /// Applies defaults and environment overrides (looked up through `env`) to a raw config.
    pub fn resolve<F>(raw: RawConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = raw.normalized();
        let env_value = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| env_value(*name))
            .or(raw.api_key);
        let inference_url = env_value(INFERENCE_URL_ENV_VAR)
            .or(raw.inference_url)
            .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string());

        Self {
            api_key,
            inference_url,
            ocr_model: raw
                .ocr_model
                .unwrap_or_else(|| DEFAULT_OCR_MODEL.to_string()),
            sentiment_model: raw
                .sentiment_model
                .unwrap_or_else(|| DEFAULT_SENTIMENT_MODEL.to_string()),
            min_line_length: raw.min_line_length.unwrap_or(DEFAULT_MIN_LINE_LENGTH),
            request_timeout: Duration::from_secs(
                raw.request_timeout_secs
                    .filter(|s| *s > 0)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            max_image_dimension: raw
                .max_image_dimension
                .unwrap_or(DEFAULT_MAX_IMAGE_DIMENSION),
            log_level: raw
                .log_level
                .as_deref()
                .and_then(LogLevel::parse)
                .unwrap_or_default(),
        }
    }

    pub fn ocr_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.inference_url, &self.ocr_model, self.request_timeout)
    }

    pub fn sentiment_endpoint(&self) -> Endpoint {
        Endpoint::new(
            &self.inference_url,
            &self.sentiment_model,
            self.request_timeout,
        )
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            api_key: self.api_key.clone(),
            min_line_length: self.min_line_length,
            max_image_dimension: self.max_image_dimension,
        }
    }

    /// Settings as shown to the user, with the API key masked.
    pub fn redacted_json(&self) -> serde_json::Value {
        serde_json::json!({
            "api_key": self.api_key.as_deref().map(redact_key),
            "inference_url": self.inference_url,
            "ocr_model": self.ocr_model,
            "sentiment_model": self.sentiment_model,
            "min_line_length": self.min_line_length,
            "request_timeout_secs": self.request_timeout.as_secs(),
            "max_image_dimension": self.max_image_dimension,
            "log_level": self.log_level.as_str(),
        })
    }
}

/// Keeps a short prefix so users can tell keys apart.
pub fn redact_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}

pub fn config_path() -> Option<PathBuf> {
    let path = config_dir()?
        .join(APP_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    Some(path)
}

fn ensure_config_dir_exists(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn load_raw_config_from(path: &Path) -> Result<RawConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(RawConfig::default());
    }

    let data = fs::read_to_string(path)?;
    let cfg: RawConfig = serde_json::from_str(&data)?;
    debug!(?path, "Config loaded");
    Ok(cfg.normalized())
}

pub fn save_raw_config_to(path: &Path, cfg: RawConfig) -> Result<(), ConfigError> {
    ensure_config_dir_exists(path)?;
    let data = serde_json::to_string_pretty(&cfg.normalized())?;
    fs::write(path, data)?;
    debug!(?path, "Config saved");
    Ok(())
}

fn load_raw_config() -> Result<RawConfig, ConfigError> {
    let Some(path) = config_path() else {
        debug!("No config_dir available, using defaults only");
        return Ok(RawConfig::default());
    };
    load_raw_config_from(&path)
}

fn load_or_default_config() -> RawConfig {
    match load_raw_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = ?err, "Failed to load existing config, starting fresh");
            RawConfig::default()
        }
    }
}

/// Reads the config file (falling back to defaults if it is missing or broken) and applies
/// environment overrides.
pub fn load_settings() -> Settings {
    Settings::resolve(load_or_default_config(), |name| std::env::var(name).ok())
}

/// Log level from the config file only, read before logging is initialized.
pub fn load_log_level() -> LogLevel {
    match load_raw_config() {
        Ok(cfg) => cfg
            .log_level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or_default(),
        Err(err) => {
            eprintln!("Config: failed to load config, using default log level: {err:?}");
            LogLevel::Info
        }
    }
}

/// Read-modify-write of the config file.
pub fn update_config<F>(change: F) -> Result<PathBuf, ConfigError>
where
    F: FnOnce(&mut RawConfig),
{
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    let mut cfg = load_raw_config_from(&path)?;
    change(&mut cfg);
    save_raw_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_api_key(key: String) -> Result<PathBuf, ConfigError> {
    debug!(len = key.len(), "Saving API key");
    update_config(|cfg| cfg.api_key = Some(key))
}

pub fn save_log_level(level: LogLevel) -> Result<PathBuf, ConfigError> {
    debug!(?level, "Saving log level");
    update_config(|cfg| cfg.log_level = Some(level.as_str().to_string()))
}

pub fn save_min_line_length(min_length: usize) -> Result<PathBuf, ConfigError> {
    debug!(min_length, "Saving minimum line length");
    update_config(|cfg| cfg.min_line_length = Some(min_length))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.inference_url, DEFAULT_INFERENCE_URL);
        assert_eq!(settings.ocr_model, DEFAULT_OCR_MODEL);
        assert_eq!(settings.sentiment_model, DEFAULT_SENTIMENT_MODEL);
        assert_eq!(settings.min_line_length, 3);
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_env_overrides_config_file_key() {
        let raw = RawConfig {
            api_key: Some("hf_from_file".into()),
            ..RawConfig::default()
        };

        let settings = Settings::resolve(raw.clone(), env_from(&[]));
        assert_eq!(settings.api_key.as_deref(), Some("hf_from_file"));

        let settings = Settings::resolve(
            raw.clone(),
            env_from(&[("HUGGINGFACE_API_KEY", "hf_generic")]),
        );
        assert_eq!(settings.api_key.as_deref(), Some("hf_generic"));

        let settings = Settings::resolve(
            raw,
            env_from(&[
                ("HUGGINGFACE_API_KEY", "hf_generic"),
                ("PIXELMOOD_API_KEY", "hf_specific"),
            ]),
        );
        assert_eq!(settings.api_key.as_deref(), Some("hf_specific"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let raw = RawConfig {
            api_key: Some("  ".into()),
            ocr_model: Some(String::new()),
            request_timeout_secs: Some(0),
            log_level: Some("loud".into()),
            ..RawConfig::default()
        };
        let settings = Settings::resolve(raw, env_from(&[("PIXELMOOD_API_KEY", "")]));
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.ocr_model, DEFAULT_OCR_MODEL);
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_endpoints_and_pipeline_config() {
        let raw = RawConfig {
            api_key: Some("hf_abc".into()),
            inference_url: Some("http://localhost:8080/".into()),
            min_line_length: Some(5),
            ..RawConfig::default()
        };
        let settings = Settings::resolve(raw, env_from(&[]));
        assert_eq!(
            settings.sentiment_endpoint().url(),
            format!("http://localhost:8080/models/{DEFAULT_SENTIMENT_MODEL}")
        );
        let pipeline = settings.pipeline_config();
        assert_eq!(pipeline.api_key.as_deref(), Some("hf_abc"));
        assert_eq!(pipeline.min_line_length, 5);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert_eq!(load_raw_config_from(&path).unwrap(), RawConfig::default());

        let cfg = RawConfig {
            api_key: Some("hf_secret".into()),
            sentiment_model: Some("".into()),
            min_line_length: Some(0),
            log_level: Some("DEBUG".into()),
            ..RawConfig::default()
        };
        save_raw_config_to(&path, cfg).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sentiment_model"));
        assert!(!written.contains("ocr_model"));

        let loaded = load_raw_config_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("hf_secret"));
        assert_eq!(loaded.sentiment_model, None);
        assert_eq!(loaded.min_line_length, Some(0));
        assert_eq!(
            Settings::resolve(loaded, env_from(&[])).log_level,
            LogLevel::Debug
        );
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_raw_config_from(&path),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(redact_key("hf_abcdefghijkl"), "hf_a****");
        assert_eq!(redact_key("short"), "****");
        let shown = Settings::resolve(
            RawConfig {
                api_key: Some("hf_abcdefghijkl".into()),
                ..RawConfig::default()
            },
            env_from(&[]),
        )
        .redacted_json();
        assert_eq!(shown["api_key"], "hf_a****");
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" trace "), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
    }
}
