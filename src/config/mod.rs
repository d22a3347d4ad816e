use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub narration: NarrationConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Pipe producing the scenario and its two paths.
    pub scenario: String,
    /// Pipe producing the vision shown after a choice.
    pub vision: String,
    /// Model used when the pipes are created or upserted.
    pub model: String,
}

/// Path engine settings
#[derive(Debug, Clone, Default)]
pub struct NarrationConfig {
    /// Upper bound on a single narration. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            // Checked by `require_api_key` once the server needs it.
            api_key: env::var("LANGBASE_API_KEY").unwrap_or_default(),
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/garden.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(30000),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(3),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(1000),
        };

        let defaults = PipeConfig::default();
        let pipes = PipeConfig {
            scenario: env::var("PIPE_SCENARIO").unwrap_or(defaults.scenario),
            vision: env::var("PIPE_VISION").unwrap_or(defaults.vision),
            model: env::var("NARRATOR_MODEL").unwrap_or(defaults.model),
        };

        let narration = NarrationConfig {
            timeout_ms: parse_var("NARRATION_TIMEOUT_MS").filter(|ms| *ms > 0),
        };

        Ok(Config {
            langbase,
            database,
            logging,
            request,
            pipes,
            narration,
        })
    }
}

impl LangbaseConfig {
    /// Fail unless an API key is set. Only the server talks to Langbase.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config {
                message: "LANGBASE_API_KEY is required to run the server".to_string(),
            });
        }
        Ok(&self.api_key)
    }
}

impl NarrationConfig {
    /// The narration timeout as a [`Duration`], if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            scenario: "garden-scenario-v1".to_string(),
            vision: "garden-vision-v1".to_string(),
            model: "openai:gpt-4o-mini".to_string(),
        }
    }
}
