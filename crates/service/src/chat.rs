//! Chat-completion backend with a delimited output contract.
//!
//! The model is asked to wrap its answer between [`START_MARKER`] and
//! [`END_MARKER`]; anything outside the markers (preambles, notes) is
//! discarded. Works with any OpenAI-compatible `chat/completions` endpoint.

use crate::client::{Backend, Outcome};
use deck_core::{Error, Result};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Opening delimiter of the translated payload.
pub const START_MARKER: &str = "[START_TRANSLATION]";

/// Closing delimiter of the translated payload.
pub const END_MARKER: &str = "[END_TRANSLATION]";

/// Google's OpenAI-compatible endpoint, usable with the same API key as
/// Cloud Translation.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Payload between the first start marker and the next end marker.
static TRANSLATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[START_TRANSLATION\](.*?)\[END_TRANSLATION\]").unwrap()
});

/// Extract the translated payload from a model reply.
///
/// Returns the trimmed text strictly between the markers, or `None` when
/// either marker is missing.
pub fn extract_translation(content: &str) -> Option<String> {
    TRANSLATION_REGEX
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Translation through a chat-completion model.
pub struct ChatBackend {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatBackend {
    /// Create a backend for `model` at `endpoint`, authenticating with a
    /// bearer token.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpError(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Model used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Backend for ChatBackend {
    fn name(&self) -> &'static str {
        "chat completion"
    }

    fn translate(&self, text: &str, target_language: &str) -> Result<Outcome> {
        let request = chat_request(&self.model, text, target_language);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| Error::HttpError(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::HttpError(format!("Failed to read response: {}", e)))?;

        Ok(classify_response(status, &body))
    }
}

fn system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate the user's text into {target}. \
         Keep proper nouns, license codes, dates and equations exactly as written. \
         Reply with the translation only, placed between {start} and {end}, \
         for example: {start}translated text{end}",
        target = target_language,
        start = START_MARKER,
        end = END_MARKER,
    )
}

fn chat_request<'a>(model: &'a str, text: &str, target_language: &str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: 0.0,
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: Some(system_prompt(target_language)),
            },
            ChatMessage {
                role: "user".to_string(),
                content: Some(text.to_string()),
            },
        ],
    }
}

fn classify_response(status: StatusCode, body: &str) -> Outcome {
    if !status.is_success() {
        log::error!("Error translating text: {} {}", status, body);
        return Outcome::Unusable(format!("HTTP {}", status));
    }

    parse_chat_response(body)
}

fn parse_chat_response(body: &str) -> Outcome {
    let response: ChatResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => return Outcome::Unusable(format!("malformed response: {}", e)),
    };

    let Some(content) = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
    else {
        return Outcome::Unusable("response held no message".to_string());
    };

    match extract_translation(&content) {
        Some(translation) => Outcome::Translated(translation),
        None => Outcome::Unusable("translation markers not found".to_string()),
    }
}
