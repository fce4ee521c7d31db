//! TOML configuration file loading
//!
//! The file is optional. Without `--config-file` the default location
//! `<config dir>/Totemscan/totemscan.toml` is used when it exists. Values
//! from the file only fill options the command line left unset.

use super::args::Args;
use crate::core::validation::{parse_unique_list, validate_api_url, validate_positive_millis};
use crate::flow::api::FlowMode;
use crate::identity::api::{ExtractionPolicy, PatternFamily};
use crate::scanner::api::{BarcodeFormat, ScannerConfig, DEFAULT_DEDUP_WINDOW};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }

    fn user_message(&self) -> Option<String> {
        if self.is_user_actionable() {
            Some(self.to_string())
        } else {
            None
        }
    }
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Totemscan").join("totemscan.toml"))
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub mode: FlowMode,
    pub dedup_window: Duration,
    pub scanner: ScannerConfig,
    pub extraction: ExtractionPolicy,
    pub store_file: Option<PathBuf>,
}

impl Args {
    /// Load the configuration file into unset fields, returning the path used
    pub async fn parse_config_file(args: &mut Self) -> Result<Option<PathBuf>, ConfigError> {
        let config_path = match &args.config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path: path.clone() })
            }
            Some(path) => path.clone(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(None),
            },
        };

        let contents = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
        let config = toml::from_str::<toml::Table>(&contents).map_err(|source| {
            ConfigError::Parse {
                path: config_path.clone(),
                source,
            }
        })?;

        Self::apply_toml_values(args, &config)?;
        Ok(Some(config_path))
    }

    /// Apply TOML values to fields the command line did not set
    pub fn apply_toml_values(args: &mut Self, config: &toml::Table) -> Result<(), ConfigError> {
        if args.color_override().is_none() {
            if let Some(color) = bool_value(config, "color")? {
                args.color = color;
                args.no_color = !color;
            }
        }

        fill(&mut args.log_level, string_value(config, "log-level")?);
        fill(&mut args.log_format, string_value(config, "log-format")?);
        fill(&mut args.log_file, string_value(config, "log-file")?.map(PathBuf::from));
        fill(&mut args.api_url, string_value(config, "api-url")?);
        fill(&mut args.api_token, string_value(config, "api-token")?);
        fill(&mut args.mode, string_value(config, "mode")?);
        fill(&mut args.store_file, string_value(config, "store-file")?.map(PathBuf::from));

        if args.dedup_window_ms.is_none() {
            if let Some(value) = config.get("dedup-window-ms") {
                let millis = value
                    .as_integer()
                    .ok_or_else(|| ConfigError::invalid("dedup-window-ms", "expected an integer"))?;
                let millis = validate_positive_millis(millis)
                    .map_err(|e| ConfigError::invalid("dedup-window-ms", e))?;
                args.dedup_window_ms = Some(millis);
            }
        }

        if !args.offload_decoding {
            args.offload_decoding = bool_value(config, "offload-decoding")?.unwrap_or(false);
        }

        if args.formats.is_empty() {
            args.formats = string_list(config, "formats")?;
        }
        if args.extraction_order.is_empty() {
            args.extraction_order = string_list(config, "extraction-order")?;
        }

        Ok(())
    }

    /// Validate and resolve arguments into runtime settings
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mode = match &self.mode {
            Some(mode) => FlowMode::from_str(mode)
                .map_err(|_| ConfigError::invalid("mode", format!("unknown mode '{}'", mode)))?,
            None => FlowMode::default(),
        };

        let mut scanner = match mode {
            FlowMode::Identity => ScannerConfig::default(),
            FlowMode::Ticket => ScannerConfig::tickets(),
        };
        if !self.formats.is_empty() {
            scanner.formats = parse_unique_list::<BarcodeFormat>(&self.formats)
                .map_err(|e| ConfigError::invalid("formats", e))?;
        }
        scanner.offload_decoding = self.offload_decoding;

        let extraction = if self.extraction_order.is_empty() {
            ExtractionPolicy::default()
        } else {
            ExtractionPolicy::with_order(
                parse_unique_list::<PatternFamily>(&self.extraction_order)
                    .map_err(|e| ConfigError::invalid("extraction-order", e))?,
            )
        };

        let dedup_window = match self.dedup_window_ms {
            Some(millis) => Duration::from_millis(
                validate_positive_millis(millis as i64)
                    .map_err(|e| ConfigError::invalid("dedup-window-ms", e))?,
            ),
            None => DEFAULT_DEDUP_WINDOW,
        };

        let api_url = self
            .api_url
            .as_deref()
            .map(validate_api_url)
            .transpose()
            .map_err(|e| ConfigError::invalid("api-url", e))?;

        Ok(Settings {
            api_url,
            api_token: self.api_token.clone(),
            mode,
            dedup_window,
            scanner,
            extraction,
            store_file: self.store_file.clone(),
        })
    }
}

fn fill<T>(target: &mut Option<T>, value: Option<T>) {
    if target.is_none() {
        *target = value;
    }
}

fn string_value(config: &toml::Table, key: &str) -> Result<Option<String>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::invalid(key, "expected a string")),
    }
}

fn bool_value(config: &toml::Table, key: &str) -> Result<Option<bool>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, "expected true or false")),
    }
}

/// Accepts a single string (comma-separated allowed) or an array of strings
fn string_list(config: &toml::Table, key: &str) -> Result<Vec<String>, ConfigError> {
    let raw: Vec<String> = match config.get(key) {
        None => return Ok(Vec::new()),
        Some(toml::Value::String(s)) => vec![s.clone()],
        Some(toml::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::invalid(key, "expected an array of strings"))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(ConfigError::invalid(key, "expected a string or array")),
    };

    Ok(raw
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Path of the preference store: explicit setting or the default location
pub fn store_path(settings: &Settings) -> Option<PathBuf> {
    settings
        .store_file
        .clone()
        .or_else(crate::store::api::FileStore::default_path)
}
