/*!
 * Mock backend implementations for testing.
 *
 * `MockBackend` simulates either backend kind:
 * - `MockBackend::remote(name)` / `MockBackend::local(name)` - always succeed,
 *   prefixing the text with the target language
 * - `.failing(error)` - always fail with the given error
 * - `.slow(delay)` - succeed after a delay (for timeout testing)
 * - `.with_script(responses)` - replay a fixed sequence of results first
 *
 * Clones share the request counter and request log.
 */

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::BackendError;

use super::{BackendKind, BackendRequest, BackendResponse, TranslationBackend};

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with this error
    Failing(BackendError),
    /// Fails only for texts containing the marker
    FailingOn { marker: String, error: BackendError },
    /// Succeeds after a delay
    Slow { delay: Duration },
}

type Script = VecDeque<Result<BackendResponse, BackendError>>;

/// Mock backend for testing orchestration behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    name: String,
    kind: BackendKind,
    behavior: MockBehavior,
    /// Confidence attached to successful responses
    confidence: Option<f32>,
    /// Results replayed before `behavior` applies
    script: Arc<Mutex<Script>>,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received
    requests: Arc<Mutex<Vec<BackendRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&BackendRequest) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(name: &str, kind: BackendKind, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behavior,
            confidence: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Working remote-kind mock
    pub fn remote(name: &str) -> Self {
        Self::new(name, BackendKind::Remote, MockBehavior::Working)
    }

    /// Working local-kind mock
    pub fn local(name: &str) -> Self {
        Self::new(name, BackendKind::Local, MockBehavior::Working)
    }

    /// Always fail with `error`
    pub fn failing(mut self, error: BackendError) -> Self {
        self.behavior = MockBehavior::Failing(error);
        self
    }

    /// Fail with `error` for texts containing `marker`
    pub fn failing_on(mut self, marker: &str, error: BackendError) -> Self {
        self.behavior = MockBehavior::FailingOn {
            marker: marker.to_string(),
            error,
        };
        self
    }

    /// Respond after `delay`
    pub fn slow(mut self, delay: Duration) -> Self {
        self.behavior = MockBehavior::Slow { delay };
        self
    }

    /// Report this confidence on success
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Replay these results before falling back to the behavior
    pub fn with_script(self, script: Vec<Result<BackendResponse, BackendError>>) -> Self {
        self.script.lock().extend(script);
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&BackendRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of `translate` calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<BackendRequest> {
        self.requests.lock().last().cloned()
    }

    /// All requests received
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &BackendRequest) -> BackendResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}] {}", request.target_lang, request.text),
        };
        let response = BackendResponse::new(text);
        match self.confidence {
            Some(confidence) => response.with_confidence(confidence),
            None => response,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, BackendError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let scripted = self.script.lock().pop_front();
        if let Some(result) = scripted {
            return result;
        }

        match &self.behavior {
            MockBehavior::Working => Ok(self.respond(request)),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::FailingOn { marker, error } => {
                if request.text.contains(marker.as_str()) {
                    Err(error.clone())
                } else {
                    Ok(self.respond(request))
                }
            }
            MockBehavior::Slow { delay } => {
                tokio::time::sleep(*delay).await;
                Ok(self.respond(request))
            }
        }
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        match &self.behavior {
            MockBehavior::Failing(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }
}
