use std::default::Default;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::BackendKind;

/// Configuration module
/// This module handles loading, validating and saving the settings of the
/// glossary store, backends, orchestrator, scorer and batch runner.
/// Represents the library configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Default domain used to resolve glossary contexts
    #[serde(default)]
    pub domain: Option<String>,

    /// Glossary file to open
    #[serde(default)]
    pub glossary_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Configured translation backends
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Primary/fallback selection
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Confidence scoring
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Batch processing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Translation memory
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Translation backend settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    // @field: Name referenced by the orchestrator and reported as engine
    pub name: String,

    // @field: Backend kind (remote|local)
    pub kind: BackendKind,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key, or env:NAME to read it from the environment
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds per call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retry count for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    // @field: Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Confidence assumed when the backend reports none
    #[serde(default)]
    pub default_confidence: Option<f32>,
}

impl BackendConfig {
    // @param name: Backend name
    // @param endpoint: API URL
    // @param api_key: Key or env:NAME
    // @returns: Remote backend config with defaults
    pub fn remote(name: &str, endpoint: &str, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Remote,
            endpoint: endpoint.to_string(),
            model: String::new(),
            api_key: api_key.to_string(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            default_confidence: None,
        }
    }

    // @param name: Backend name
    // @param model: Ollama model
    // @returns: Local backend config with defaults
    pub fn local(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Local,
            endpoint: default_ollama_endpoint(),
            model: model.to_string(),
            api_key: String::new(),
            timeout_secs: default_local_timeout_secs(),
            max_retries: 1,
            retry_backoff_ms: default_retry_backoff_ms(),
            default_confidence: None,
        }
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Endpoint, or the kind's default when unset
    pub fn endpoint_or_default(&self) -> String {
        if !self.endpoint.trim().is_empty() {
            return self.endpoint.trim().to_string();
        }
        match self.kind {
            BackendKind::Remote => default_remote_endpoint(),
            BackendKind::Local => default_ollama_endpoint(),
        }
    }

    /// Model, or the kind's default when unset
    pub fn model_or_default(&self) -> String {
        if !self.model.trim().is_empty() {
            return self.model.trim().to_string();
        }
        match self.kind {
            BackendKind::Remote => String::new(),
            BackendKind::Local => default_ollama_model(),
        }
    }

    /// Resolve the API key, reading `env:NAME` values from the environment
    pub fn resolved_api_key(&self) -> Result<Option<String>> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Ok(None);
        }
        match key.strip_prefix("env:") {
            Some(var) => {
                let value = std::env::var(var.trim())
                    .with_context(|| format!("API key variable {} for backend '{}' is not set", var, self.name))?;
                Ok(Some(value))
            }
            None => Ok(Some(key.to_string())),
        }
    }
}

/// Primary/fallback selection
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Backend tried first
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Backend tried when the primary fails or is below threshold
    #[serde(default)]
    pub fallback: Option<String>,

    /// Minimum confidence for a backend result to be accepted
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallback: None,
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Weights and thresholds of the quality scorer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Weight of the backend confidence
    #[serde(default = "default_backend_weight")]
    pub backend_weight: f32,

    /// Weight of the glossary coverage ratio
    #[serde(default = "default_glossary_weight")]
    pub glossary_weight: f32,

    /// Spans scoring below this are flagged for review
    #[serde(default = "default_span_threshold")]
    pub span_threshold: f32,

    /// Lower bound of a plausible target/source length ratio
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f32,

    /// Upper bound of a plausible target/source length ratio
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            backend_weight: default_backend_weight(),
            glossary_weight: default_glossary_weight(),
            span_threshold: default_span_threshold(),
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
        }
    }
}

/// Batch runner settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    /// Documents translated concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Translation memory settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MemoryConfig {
    /// Whether results are looked up and stored
    #[serde(default)]
    pub enabled: bool,

    /// SQLite file; in-memory when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
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
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_local_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_primary() -> String {
    "ollama".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.75
}

fn default_backend_weight() -> f32 {
    0.6
}

fn default_glossary_weight() -> f32 {
    0.4
}

fn default_span_threshold() -> f32 {
    0.6
}

fn default_min_length_ratio() -> f32 {
    0.3
}

fn default_max_length_ratio() -> f32 {
    3.0
}

fn default_workers() -> usize {
    4
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama2".to_string()
}

fn default_remote_endpoint() -> String {
    "http://localhost:5000/translate".to_string()
}

fn default_backends() -> Vec<BackendConfig> {
    vec![BackendConfig::local(&default_primary(), &default_ollama_model())]
}

fn in_unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Look up a backend by name
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        // Backends
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.name.trim().is_empty() {
                return Err(anyhow!("Backend #{} has an empty name", i));
            }
            if self.backends[..i].iter().any(|b| b.name == backend.name) {
                return Err(anyhow!("Duplicate backend name: {}", backend.name));
            }
            if backend.timeout_secs == 0 {
                return Err(anyhow!("Backend '{}' must have a timeout above zero", backend.name));
            }
            if let Some(confidence) = backend.default_confidence {
                if !in_unit_range(confidence) {
                    return Err(anyhow!(
                        "Backend '{}' default confidence must be within [0, 1], got {}",
                        backend.name,
                        confidence
                    ));
                }
            }
        }

        // Orchestrator
        let primary = self
            .backend(&self.orchestrator.primary)
            .ok_or_else(|| anyhow!("Primary backend '{}' is not configured", self.orchestrator.primary))?;
        let mut referenced = vec![primary];
        if let Some(fallback_name) = &self.orchestrator.fallback {
            if fallback_name == &self.orchestrator.primary {
                return Err(anyhow!("Fallback backend must differ from the primary"));
            }
            let fallback = self
                .backend(fallback_name)
                .ok_or_else(|| anyhow!("Fallback backend '{}' is not configured", fallback_name))?;
            referenced.push(fallback);
        }
        for backend in referenced {
            if backend.kind == BackendKind::Remote && backend.api_key.trim().is_empty() {
                return Err(anyhow!("API key is required for remote backend '{}'", backend.name));
            }
        }
        if !in_unit_range(self.orchestrator.confidence_threshold) {
            return Err(anyhow!(
                "Confidence threshold must be within [0, 1], got {}",
                self.orchestrator.confidence_threshold
            ));
        }

        // Scoring
        let scoring = &self.scoring;
        if scoring.backend_weight < 0.0 || scoring.glossary_weight < 0.0 {
            return Err(anyhow!("Scoring weights must not be negative"));
        }
        if scoring.backend_weight + scoring.glossary_weight <= 0.0 {
            return Err(anyhow!("At least one scoring weight must be positive"));
        }
        if !in_unit_range(scoring.span_threshold) {
            return Err(anyhow!("Span threshold must be within [0, 1], got {}", scoring.span_threshold));
        }
        if scoring.min_length_ratio <= 0.0 || scoring.min_length_ratio >= scoring.max_length_ratio {
            return Err(anyhow!(
                "Invalid length ratio band [{}, {}]",
                scoring.min_length_ratio,
                scoring.max_length_ratio
            ));
        }

        if self.batch.workers == 0 {
            return Err(anyhow!("Batch workers must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "sw".to_string(),
            domain: None,
            glossary_path: None,
            log_level: LogLevel::default(),
            backends: default_backends(),
            orchestrator: OrchestratorConfig::default(),
            scoring: ScoringConfig::default(),
            batch: BatchConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}
