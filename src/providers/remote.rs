use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::BackendConfig;
use crate::errors::{AppError, BackendError};
use crate::language_utils;
use crate::translation::result::SpanAlignment;

use super::{BackendKind, BackendRequest, BackendResponse, GlossaryHint, TranslationBackend};

/// Remote translation API client
///
/// Speaks a JSON protocol compatible with LibreTranslate-style services:
/// `POST {endpoint}` with `{q, source, target, format}` and a bearer token,
/// answered by `{translatedText, confidence?, alignment?}`.
#[derive(Debug)]
pub struct RemoteBackend {
    name: String,
    endpoint: Url,
    model: Option<String>,
    api_key: String,
    client: Client,
    default_confidence: Option<f32>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: String,
    target: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "<[GlossaryHint]>::is_empty")]
    glossary: &'a [GlossaryHint],
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText", alias = "translated_text")]
    translated_text: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    alignment: Option<Vec<SpanAlignment>>,
}

/// Parse a `Retry-After` value: delay seconds or an HTTP date
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Map an unsuccessful HTTP status to a backend error
pub fn map_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> BackendError {
    let message = format!("HTTP {}: {}", status, body.trim());
    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimit { message, retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            BackendError::Network(message)
        }
        s if s.is_server_error() => BackendError::Network(message),
        _ => BackendError::InvalidResponse(message),
    }
}

fn map_transport_error(error: reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Network(error.to_string())
    }
}

fn api_code(code: &str) -> String {
    language_utils::normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

impl RemoteBackend {
    /// Create a new remote client
    pub fn new(name: &str, endpoint: &str, api_key: &str) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| AppError::Config(format!("Invalid endpoint for backend '{}': {}", name, e)))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(AppError::Config(format!(
                "Backend '{}' endpoint must be http or https, got {}",
                name,
                endpoint.scheme()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            endpoint,
            model: None,
            api_key: api_key.to_string(),
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?,
            default_confidence: None,
        })
    }

    /// Create a client from backend configuration, resolving `env:` API keys
    pub fn from_config(config: &BackendConfig) -> Result<Self, AppError> {
        let api_key = config
            .resolved_api_key()
            .map_err(|e| AppError::Config(e.to_string()))?
            .ok_or_else(|| AppError::Config(format!("API key is required for remote backend '{}'", config.name)))?;
        let mut backend = Self::new(&config.name, &config.endpoint_or_default(), &api_key)?;
        let model = config.model_or_default();
        backend.model = (!model.is_empty()).then_some(model);
        backend.default_confidence = config.default_confidence;
        Ok(backend)
    }

    /// Endpoint in use
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationBackend for RemoteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn default_confidence(&self) -> f32 {
        self.default_confidence
            .unwrap_or_else(|| self.kind().default_confidence())
    }

    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, BackendError> {
        let body = TranslateRequest {
            q: &request.text,
            source: api_code(&request.source_lang),
            target: api_code(&request.target_lang),
            format: "text",
            model: self.model.as_deref(),
            domain: request.domain.as_deref(),
            glossary: &request.glossary_hints,
        };

        debug!("Remote '{}' translating {} chars", self.name, request.text.len());
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(request.timeout)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let mapped = map_status(status, &error_text, retry_after);
            match &mapped {
                BackendError::RateLimit { .. } => warn!("Remote '{}' rate limited: {}", self.name, mapped),
                _ => error!("Remote '{}' API error ({}): {}", self.name, status, error_text),
            }
            return Err(mapped);
        }

        let parsed = response
            .json::<TranslateResponse>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        if parsed.translated_text.trim().is_empty() {
            return Err(BackendError::InvalidResponse("empty translation".to_string()));
        }

        let mut result = BackendResponse::new(parsed.translated_text);
        if let Some(confidence) = parsed.confidence.filter(|c| (0.0..=1.0).contains(c)) {
            result = result.with_confidence(confidence);
        }
        if let Some(alignment) = parsed.alignment {
            result = result.with_alignment(alignment);
        }
        Ok(result)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let request = BackendRequest::new("Hello", "en", "es").with_timeout(Duration::from_secs(10));
        self.translate(&request).await?;
        Ok(())
    }
}
