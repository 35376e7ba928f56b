//! Layered configuration: built-in defaults, then `tempo.toml`, then `TEMPO_*` variables.
//!
//! Every setting is addressed by a dotted key (`quotes.currency`). The same key
//! table drives file lookup, environment lookup and source reporting.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

use crate::engine::{QuoteSettings, DEFAULT_VALIDITY_DAYS};

/// File names tried, in order, when no explicit path is given.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["tempo.toml", "config/tempo.toml"];

/// A configurable setting and the environment variables that can set it.
/// The first variable that is set and non-blank wins.
#[derive(Clone, Copy, Debug)]
pub struct ConfigKey {
    pub path: &'static str,
    pub env: &'static [&'static str],
}

pub const CONFIG_KEYS: &[ConfigKey] = &[
    ConfigKey { path: "store.backend", env: &["TEMPO_STORE_BACKEND"] },
    ConfigKey {
        path: "store.database_url",
        env: &["TEMPO_STORE_DATABASE_URL", "TEMPO_DATABASE_URL"],
    },
    ConfigKey { path: "store.max_connections", env: &["TEMPO_STORE_MAX_CONNECTIONS"] },
    ConfigKey { path: "store.timeout_secs", env: &["TEMPO_STORE_TIMEOUT_SECS"] },
    ConfigKey { path: "quotes.validity_days", env: &["TEMPO_QUOTES_VALIDITY_DAYS"] },
    ConfigKey { path: "quotes.currency", env: &["TEMPO_QUOTES_CURRENCY"] },
    ConfigKey {
        path: "delivery.document_base_url",
        env: &["TEMPO_DELIVERY_DOCUMENT_BASE_URL"],
    },
    ConfigKey { path: "delivery.output_dir", env: &["TEMPO_DELIVERY_OUTPUT_DIR"] },
    ConfigKey { path: "delivery.sender_name", env: &["TEMPO_DELIVERY_SENDER_NAME"] },
    ConfigKey { path: "logging.level", env: &["TEMPO_LOGGING_LEVEL", "TEMPO_LOG_LEVEL"] },
    ConfigKey { path: "logging.format", env: &["TEMPO_LOGGING_FORMAT", "TEMPO_LOG_FORMAT"] },
];

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub quotes: QuotesConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuotesConfig {
    pub validity_days: u32,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeliveryConfig {
    pub document_base_url: String,
    pub output_dir: PathBuf,
    pub sender_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

/// Where the effective value of a setting came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSource {
    Default,
    File(PathBuf),
    Env(&'static str),
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Env(var) => write!(f, "env ({var})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable `{var}` referenced in the config file is not set")]
    MissingEnvInterpolation { var: String },
    #[error("`${{` in the config file is never closed")]
    UnterminatedInterpolation,
    #[error("`{key}` in `{path}` has an unusable value: {reason}")]
    InvalidFileValue { path: PathBuf, key: &'static str, reason: String },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: "sqlite://tempo.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            quotes: QuotesConfig {
                validity_days: DEFAULT_VALIDITY_DAYS,
                currency: "USD".to_string(),
            },
            delivery: DeliveryConfig {
                document_base_url: "https://tempo.app".to_string(),
                output_dir: PathBuf::from("quotes"),
                sender_name: "Your Team".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unsupported store backend `{other}` (expected memory|sqlite)")),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => {
                Err(format!("unsupported log format `{other}` (expected compact|pretty|json)"))
            }
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match find_config_file(options.config_path.as_deref()) {
            Some(path) => {
                let table = read_table(&path)?;
                config.apply_file(&path, &table)?;
            }
            None if options.require_file => {
                let expected = options
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reports which layer supplied each setting, in [`CONFIG_KEYS`] order.
    pub fn sources(options: &LoadOptions) -> Vec<(&'static str, ValueSource)> {
        let file = find_config_file(options.config_path.as_deref())
            .and_then(|path| read_table(&path).ok().map(|table| (path, table)));

        CONFIG_KEYS
            .iter()
            .map(|key| {
                let source = if let Some((var, _)) = env_value(key) {
                    ValueSource::Env(var)
                } else if let Some((path, _)) =
                    file.as_ref().filter(|(_, table)| lookup(table, key.path).is_some())
                {
                    ValueSource::File(path.clone())
                } else {
                    ValueSource::Default
                };
                (key.path, source)
            })
            .collect()
    }

    pub fn quote_settings(&self) -> QuoteSettings {
        QuoteSettings {
            validity_days: self.quotes.validity_days,
            currency: self.quotes.currency.clone(),
        }
    }

    fn apply_file(&mut self, path: &Path, table: &Table) -> Result<(), ConfigError> {
        for key in CONFIG_KEYS {
            let Some(value) = lookup(table, key.path) else {
                continue;
            };
            let raw = match value {
                Value::String(text) => text.clone(),
                Value::Integer(_) | Value::Boolean(_) | Value::Float(_) => value.to_string(),
                other => {
                    return Err(ConfigError::InvalidFileValue {
                        path: path.to_path_buf(),
                        key: key.path,
                        reason: format!("expected a scalar, found {}", other.type_str()),
                    })
                }
            };
            self.set(key.path, &raw).map_err(|reason| ConfigError::InvalidFileValue {
                path: path.to_path_buf(),
                key: key.path,
                reason,
            })?;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        for key in CONFIG_KEYS {
            if let Some((var, value)) = env_value(key) {
                self.set(key.path, &value).map_err(|_| ConfigError::InvalidEnvOverride {
                    key: var.to_string(),
                    value: value.clone(),
                })?;
            }
        }
        Ok(())
    }

    /// Parses `raw` into the setting named by `path`. Range checks happen in [`Self::validate`].
    fn set(&mut self, path: &str, raw: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
            raw.trim().parse().map_err(|_| format!("`{raw}` is not a whole number"))
        }

        match path {
            "store.backend" => self.store.backend = raw.parse()?,
            "store.database_url" => self.store.database_url = raw.to_string(),
            "store.max_connections" => self.store.max_connections = number(raw)?,
            "store.timeout_secs" => self.store.timeout_secs = number(raw)?,
            "quotes.validity_days" => self.quotes.validity_days = number(raw)?,
            "quotes.currency" => self.quotes.currency = raw.trim().to_string(),
            "delivery.document_base_url" => self.delivery.document_base_url = raw.to_string(),
            "delivery.output_dir" => self.delivery.output_dir = PathBuf::from(raw),
            "delivery.sender_name" => self.delivery.sender_name = raw.to_string(),
            "logging.level" => self.logging.level = raw.to_string(),
            "logging.format" => self.logging.format = raw.parse()?,
            other => return Err(format!("unknown setting `{other}`")),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problem = self
            .store
            .problem()
            .or_else(|| self.quotes.problem())
            .or_else(|| self.delivery.problem())
            .or_else(|| self.logging.problem());
        match problem {
            Some(message) => Err(ConfigError::Validation(message)),
            None => Ok(()),
        }
    }
}

impl StoreConfig {
    fn problem(&self) -> Option<String> {
        let url = self.database_url.trim();
        if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
            return Some(
                "store.database_url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                    .to_string(),
            );
        }
        if self.max_connections == 0 {
            return Some("store.max_connections must be greater than zero".to_string());
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Some("store.timeout_secs must be in range 1..=300".to_string());
        }
        None
    }
}

impl QuotesConfig {
    fn problem(&self) -> Option<String> {
        if !(1..=365).contains(&self.validity_days) {
            return Some("quotes.validity_days must be in range 1..=365".to_string());
        }
        let currency = self.currency.as_str();
        if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Some(format!("quotes.currency must be a three-letter code, got `{currency}`"));
        }
        None
    }
}

impl DeliveryConfig {
    fn problem(&self) -> Option<String> {
        let base_url = &self.document_base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Some(
                "delivery.document_base_url must start with http:// or https://".to_string(),
            );
        }
        if self.output_dir.as_os_str().is_empty() {
            return Some("delivery.output_dir must not be empty".to_string());
        }
        if self.sender_name.trim().is_empty() {
            return Some("delivery.sender_name must not be blank".to_string());
        }
        None
    }
}

impl LoggingConfig {
    fn problem(&self) -> Option<String> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => None,
            _ => Some("logging.level must be one of trace|debug|info|warn|error".to_string()),
        }
    }
}

fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let expanded = expand_env_references(&raw)?;
    toml::from_str::<Table>(&expanded)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn lookup<'a>(table: &'a Table, dotted: &str) -> Option<&'a Value> {
    let (section, field) = dotted.split_once('.')?;
    table.get(section)?.as_table()?.get(field)
}

fn env_value(key: &ConfigKey) -> Option<(&'static str, String)> {
    key.env.iter().find_map(|var| {
        env::var(var).ok().filter(|value| !value.trim().is_empty()).map(|value| (*var, value))
    })
}

/// Replaces every `${NAME}` with the value of the environment variable `NAME`.
fn expand_env_references(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let name = &after[..end];
        let value = env::var(name)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: name.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}
