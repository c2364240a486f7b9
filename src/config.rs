use std::{
    fs,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CONFIG_FILE: &str = "clarity.jsonc";
pub const DEFAULT_SCHEMA_FILE: &str = "clarity.schema.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000))
}

fn default_decision_timeout_ms() -> u64 {
    8_000
}

fn default_model_id() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url_env() -> String {
    "OPENAI_BASE_URL".to_string()
}

fn default_max_output_tokens() -> u64 {
    800
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    #[serde(default = "default_decision_timeout_ms")]
    pub timeout_ms: u64,
}

impl DecisionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_decision_timeout_ms(),
        }
    }
}

/// Non-secret model settings. The credential and endpoint themselves are
/// read from the environment variables named here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model_id(),
            api_key_env: default_api_key_env(),
            base_url_env: default_base_url_env(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    /// Loads the file passed on the command line, falls back to
    /// `./clarity.jsonc` when it exists, and to built-in defaults otherwise.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::load(default_path).with_context(|| {
                format!("failed to load config from {}", default_path.display())
            });
        }

        Ok(Self::default())
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema = load_schema(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

/// Schema shipped inside the binary, used when the config file neither
/// names a schema nor sits next to `clarity.schema.json`.
const BUNDLED_SCHEMA: &str = include_str!("../clarity.schema.json");

fn load_schema(config_base: &Path, config_value: &Value) -> Result<Value> {
    let schema_path = match config_value.get("$schema").and_then(Value::as_str) {
        Some(path_text) => Some(config_base.join(path_text)),
        None => Some(config_base.join(DEFAULT_SCHEMA_FILE)).filter(|path| path.exists()),
    };

    let Some(schema_path) = schema_path else {
        return serde_json::from_str(BUNDLED_SCHEMA).context("bundled config schema is invalid");
    };
    let schema_content = fs::read_to_string(&schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))
}

fn validate_against_schema(config_value: &Value, schema: &Value) -> Result<()> {
    let compiled =
        JSONSchema::compile(schema).map_err(|err| anyhow!("failed to compile schema: {err}"))?;

    if let Err(errors) = compiled.validate(config_value) {
        let messages = errors
            .map(|error| match error.instance_path.to_string() {
                path if path.is_empty() => error.to_string(),
                path => format!("{path}: {error}"),
            })
            .collect::<Vec<_>>();
        bail!("config validation failed: {}", messages.join("; "));
    }
    Ok(())
}
