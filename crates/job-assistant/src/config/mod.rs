use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::workflows::job_search::assistant::{AssistantSettings, DEFAULT_MAX_ATTEMPTS};
use crate::workflows::job_search::retrieval::{
    RetrievalSettings, DEFAULT_CANDIDATE_MULTIPLIER, DEFAULT_RESULT_LIMIT,
};
use crate::workflows::job_search::salary::{SalaryParser, DEFAULT_TOLERANCE_RATIO};
use crate::workflows::job_search::understanding::{
    KeywordHeuristics, RemoteSettings, RemoteUnderstanding, TextUnderstandingProvider,
    UnderstandingError, WithFallback, DEFAULT_HISTORY_WINDOW,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assistant: AssistantConfig,
    pub understanding: UnderstandingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assistant: AssistantConfig::load()?,
            understanding: UnderstandingConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Dialogue and retrieval tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub salary_tolerance: f64,
    pub candidate_multiplier: usize,
    pub result_limit: usize,
    pub retrieval_timeout: Duration,
    pub max_attempts: u8,
    pub postings_csv: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            salary_tolerance: DEFAULT_TOLERANCE_RATIO,
            candidate_multiplier: DEFAULT_CANDIDATE_MULTIPLIER,
            result_limit: DEFAULT_RESULT_LIMIT,
            retrieval_timeout: Duration::from_millis(5_000),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            postings_csv: None,
        }
    }
}

impl AssistantConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let salary_tolerance =
            parse_var("ASSISTANT_SALARY_TOLERANCE", defaults.salary_tolerance)?;
        if !(0.0..=1.0).contains(&salary_tolerance) {
            return Err(ConfigError::OutOfRange {
                variable: "ASSISTANT_SALARY_TOLERANCE",
                expected: "a ratio between 0.0 and 1.0",
            });
        }

        let candidate_multiplier =
            parse_var("ASSISTANT_CANDIDATE_MULTIPLIER", defaults.candidate_multiplier)?;
        let result_limit = parse_var("ASSISTANT_RESULT_LIMIT", defaults.result_limit)?;
        for (variable, value) in [
            ("ASSISTANT_CANDIDATE_MULTIPLIER", candidate_multiplier),
            ("ASSISTANT_RESULT_LIMIT", result_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    variable,
                    expected: "at least 1",
                });
            }
        }

        let timeout_ms = parse_var("ASSISTANT_RETRIEVAL_TIMEOUT_MS", 5_000u64)?;
        let max_attempts = parse_var("ASSISTANT_MAX_ATTEMPTS", defaults.max_attempts)?;
        let postings_csv = optional_var("ASSISTANT_POSTINGS_CSV").map(PathBuf::from);

        Ok(Self {
            salary_tolerance,
            candidate_multiplier,
            result_limit,
            retrieval_timeout: Duration::from_millis(timeout_ms),
            max_attempts,
            postings_csv,
        })
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            tolerance_ratio: self.salary_tolerance,
            candidate_multiplier: self.candidate_multiplier,
            timeout: self.retrieval_timeout,
        }
    }

    pub fn assistant_settings(&self) -> AssistantSettings {
        AssistantSettings {
            result_limit: self.result_limit,
            max_attempts: self.max_attempts,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn salary_parser(&self) -> SalaryParser {
        SalaryParser::new(self.salary_tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderstandingBackend {
    Heuristic,
    Remote,
}

/// Which text-understanding provider to run, and how to reach a remote one.
#[derive(Debug, Clone, PartialEq)]
pub struct UnderstandingConfig {
    pub backend: UnderstandingBackend,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for UnderstandingConfig {
    fn default() -> Self {
        Self {
            backend: UnderstandingBackend::Heuristic,
            url: None,
            api_key: None,
            model: "deepseek-v3".to_string(),
            timeout: Duration::from_millis(15_000),
        }
    }
}

impl UnderstandingConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match optional_var("ASSISTANT_NLU_BACKEND")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("heuristic") | Some("heuristics") => UnderstandingBackend::Heuristic,
            Some("remote") => UnderstandingBackend::Remote,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let url = optional_var("ASSISTANT_NLU_URL");
        if backend == UnderstandingBackend::Remote && url.is_none() {
            return Err(ConfigError::MissingVariable("ASSISTANT_NLU_URL"));
        }

        let timeout_ms = parse_var("ASSISTANT_NLU_TIMEOUT_MS", 15_000u64)?;

        Ok(Self {
            backend,
            url,
            api_key: optional_var("ASSISTANT_NLU_API_KEY"),
            model: optional_var("ASSISTANT_NLU_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Build the configured provider. A remote backend always falls back to the heuristics.
    pub fn provider(
        &self,
        parser: SalaryParser,
    ) -> Result<Arc<dyn TextUnderstandingProvider>, UnderstandingError> {
        let heuristics = KeywordHeuristics::new(parser);
        match self.backend {
            UnderstandingBackend::Heuristic => Ok(Arc::new(heuristics)),
            UnderstandingBackend::Remote => {
                let remote = RemoteUnderstanding::new(RemoteSettings {
                    endpoint: self.url.clone().ok_or(UnderstandingError::Disabled)?,
                    api_key: self.api_key.clone(),
                    model: self.model.clone(),
                    timeout: self.timeout,
                })?;
                Ok(Arc::new(WithFallback::new(remote, heuristics)))
            }
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { variable: name, value }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
    OutOfRange { variable: &'static str, expected: &'static str },
    MissingVariable(&'static str),
    UnknownBackend(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{} has an invalid value '{}'", variable, value)
            }
            ConfigError::OutOfRange { variable, expected } => {
                write!(f, "{} must be {}", variable, expected)
            }
            ConfigError::MissingVariable(variable) => {
                write!(f, "{} must be set for the selected backend", variable)
            }
            ConfigError::UnknownBackend(value) => write!(
                f,
                "ASSISTANT_NLU_BACKEND must be 'heuristic' or 'remote', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
