//! Client configuration.

use crate::chat::{self, ChatBackend};
use crate::client::{Backend, TranslationClient};
use crate::google::GoogleBackend;
use deck_core::{RateLimits, Result};
use std::time::Duration;

/// Which remote service performs translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Google Cloud Translation v2. Targets are ISO 639 codes.
    #[default]
    Google,
    /// OpenAI-compatible chat completion. Targets may be language names.
    Chat,
}

/// Everything needed to build a [`TranslationClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend: BackendKind,
    pub api_key: String,
    /// Chat model; ignored by the Google backend.
    pub model: String,
    /// Full chat-completion URL. The Google backend always uses its own host.
    pub endpoint: Option<String>,
    pub limits: RateLimits,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default model, limits and timeout.
    pub fn new(backend: BackendKind, api_key: impl Into<String>) -> Self {
        Self {
            backend,
            api_key: api_key.into(),
            model: chat::DEFAULT_MODEL.to_string(),
            endpoint: None,
            limits: RateLimits::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build the Google backend. Also used for language listing and
    /// validation whichever backend translates.
    pub fn google_backend(&self) -> Result<GoogleBackend> {
        GoogleBackend::new(self.api_key.clone(), self.timeout)
    }

    /// Build the configured backend.
    pub fn build_backend(&self) -> Result<Box<dyn Backend>> {
        Ok(match self.backend {
            BackendKind::Google => Box::new(self.google_backend()?),
            BackendKind::Chat => Box::new(ChatBackend::new(
                self.api_key.clone(),
                self.endpoint.as_deref().unwrap_or(chat::DEFAULT_ENDPOINT),
                self.model.clone(),
                self.timeout,
            )?),
        })
    }

    /// Build a rate-limited client for the configured backend.
    pub fn build_client(&self) -> Result<TranslationClient<Box<dyn Backend>>> {
        log::debug!(
            "Using {:?} backend, {} requests / {} tokens per {}s",
            self.backend,
            self.limits.max_requests,
            self.limits.max_tokens,
            self.limits.window.as_secs()
        );
        Ok(TranslationClient::new(self.build_backend()?, self.limits))
    }
}
