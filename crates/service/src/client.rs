//! Rate-limited, fail-open translation client.

use deck_core::{
    estimate_tokens, is_meaningful, Clock, RateLimiter, RateLimits, Result, SystemClock,
    Translator,
};

/// What a backend made of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service returned a translation.
    Translated(String),
    /// The service answered, but not with anything usable. Holds the reason.
    Unusable(String),
}

/// A remote translation service.
///
/// `Err` is reserved for transport failures (no answer at all); every
/// answer the service does give maps to an [`Outcome`].
pub trait Backend {
    /// Short name for log messages.
    fn name(&self) -> &'static str;

    /// Ask the service to translate `text` into `target_language`.
    fn translate(&self, text: &str, target_language: &str) -> Result<Outcome>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn translate(&self, text: &str, target_language: &str) -> Result<Outcome> {
        (**self).translate(text, target_language)
    }
}

/// Translator that throttles calls to a backend and keeps the source text
/// whenever the backend's answer is unusable.
pub struct TranslationClient<B, C: Clock = SystemClock> {
    backend: B,
    limiter: RateLimiter<C>,
}

impl<B: Backend> TranslationClient<B> {
    /// Create a client on the wall clock.
    pub fn new(backend: B, limits: RateLimits) -> Self {
        Self::with_limiter(backend, RateLimiter::new(limits))
    }
}

impl<B: Backend, C: Clock> TranslationClient<B, C> {
    /// Create a client with a preconfigured limiter.
    pub fn with_limiter(backend: B, limiter: RateLimiter<C>) -> Self {
        Self { backend, limiter }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }
}

impl<B: Backend, C: Clock> Translator for TranslationClient<B, C> {
    fn translate(&mut self, text: &str, target_language: &str) -> Result<String> {
        if text.trim().is_empty() || !is_meaningful(text) {
            return Ok(text.to_string());
        }

        self.limiter.acquire(estimate_tokens(text));

        match self.backend.translate(text, target_language)? {
            Outcome::Translated(translated) => Ok(translated),
            Outcome::Unusable(reason) => {
                log::warn!(
                    "{} gave no usable translation ({}), keeping original text",
                    self.backend.name(),
                    reason
                );
                Ok(text.to_string())
            }
        }
    }
}
