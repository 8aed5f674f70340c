use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::BackendConfig;
use crate::errors::{AppError, BackendError};
use crate::language_utils;

use super::{BackendKind, BackendRequest, BackendResponse, TranslationBackend};

/// Local backend talking to an Ollama server
#[derive(Debug)]
pub struct OllamaBackend {
    /// Configured backend name
    name: String,
    /// Base URL of the Ollama API
    base_url: Url,
    /// Model to generate with
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Confidence override from configuration
    default_confidence: Option<f32>,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Builder methods for GenerationRequest
impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

/// Build the translation prompt, listing glossary terms the model must use
pub fn build_prompt(request: &BackendRequest) -> String {
    let source = language_utils::display_name(&request.source_lang);
    let target = language_utils::display_name(&request.target_lang);

    let mut prompt = format!(
        "Translate the following text from {} to {}. Maintain the original meaning and technical accuracy.",
        source, target
    );
    if let Some(domain) = request.domain.as_deref() {
        prompt.push_str(&format!(" The text belongs to the {} domain.", domain));
    }
    if !request.glossary_hints.is_empty() {
        prompt.push_str("\nUse these exact term translations:\n");
        for hint in &request.glossary_hints {
            prompt.push_str(&format!("- {} → {}\n", hint.source_term, hint.target_term));
        }
    }
    prompt.push_str("\nRespond with the translation only.\n\nText:\n");
    prompt.push_str(&request.text);
    prompt
}

/// Parse a generate response, accepting a single object or streamed JSON lines
fn parse_generation(body: &str) -> Result<String, BackendError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(response.response);
    }

    // A streamed body is one JSON object per line; the pieces concatenate
    let mut full_response = String::new();
    let mut done = false;
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                full_response.push_str(part);
            }
            done |= value.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
        }
    }
    if done {
        return Ok(full_response);
    }

    let preview: String = body.chars().take(500).collect();
    error!("Failed to parse Ollama API response. Raw response (first 500 chars): {}", preview);
    Err(BackendError::InvalidResponse("unparseable Ollama response".to_string()))
}

fn map_transport_error(error: reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        // Connection refused, DNS failure: the service is not there
        BackendError::Unavailable(error.to_string())
    }
}

impl OllamaBackend {
    /// Create a client for `endpoint` (scheme and port optional)
    pub fn new(name: &str, endpoint: &str, model: &str) -> Result<Self, AppError> {
        let base_url = parse_endpoint(endpoint)?;
        Ok(Self {
            name: name.to_string(),
            base_url,
            model: model.to_string(),
            client: Client::builder()
                // Ollama uses HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?,
            default_confidence: None,
        })
    }

    /// Create a client from backend configuration
    pub fn from_config(config: &BackendConfig) -> Result<Self, AppError> {
        let mut backend = Self::new(&config.name, &config.endpoint_or_default(), &config.model_or_default())?;
        backend.default_confidence = config.default_confidence;
        Ok(backend)
    }

    /// Base URL in use
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidResponse(format!("invalid Ollama URL: {}", e)))
    }

    /// Server version, used as a liveness probe
    pub async fn version(&self) -> Result<String, BackendError> {
        let url = self.api_url("api/version")?;
        let timeout = Duration::from_secs(5);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;
        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!("Ollama returned {}", response.status())));
        }
        let version = response
            .json::<VersionResponse>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(version.version)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, AppError> {
    let endpoint = endpoint.trim();
    let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| AppError::Config(format!("Invalid Ollama endpoint '{}': {}", endpoint, e)))?;
    if url.port().is_none() && !endpoint.starts_with("http") {
        let _ = url.set_port(Some(11434));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn default_confidence(&self) -> f32 {
        self.default_confidence
            .unwrap_or_else(|| self.kind().default_confidence())
    }

    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, BackendError> {
        let url = self.api_url("api/generate")?;
        let generation = GenerationRequest::new(&self.model, build_prompt(request))
            .system("You are a professional translator.")
            .temperature(0.1);

        debug!("Ollama '{}' translating {} chars with {}", self.name, request.text.len(), self.model);
        let response = self
            .client
            .post(url)
            .timeout(request.timeout)
            .json(&generation)
            .send()
            .await
            .map_err(|e| map_transport_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(match status {
                // Model not pulled, or the server is overloaded
                StatusCode::NOT_FOUND => BackendError::Unavailable(format!("model {} not found", self.model)),
                s if s.is_server_error() => BackendError::Unavailable(format!("Ollama error {}: {}", s, error_text)),
                s => BackendError::InvalidResponse(format!("Ollama error {}: {}", s, error_text)),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, request.timeout))?;
        let text = parse_generation(&body)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BackendError::InvalidResponse("empty translation".to_string()));
        }
        Ok(BackendResponse::new(text))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let version = self.version().await?;
        debug!("Ollama '{}' is up (version {})", self.name, version);
        Ok(())
    }
}
