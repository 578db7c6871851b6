//! Google Cloud Translation (v2 REST) backend.

use crate::client::{Backend, Outcome};
use deck_core::{Error, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://translation.googleapis.com";

const TRANSLATE_PATH: &str = "/language/translate/v2";
const LANGUAGES_PATH: &str = "/language/translate/v2/languages";

/// Single-field translate calls against Cloud Translation v2.
pub struct GoogleBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    data: Option<LanguageList>,
}

#[derive(Debug, Deserialize)]
struct LanguageList {
    #[serde(default)]
    languages: Vec<Language>,
}

#[derive(Debug, Deserialize)]
struct Language {
    language: String,
}

impl GoogleBackend {
    /// Create a backend authenticating with `api_key`.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the backend at another host (proxies, emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Host requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Language codes the service can translate into.
    pub fn supported_languages(&self) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, LANGUAGES_PATH);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(|e| Error::HttpError(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::HttpError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::ServiceError(format!(
                "Error fetching supported languages: {} {}",
                status, body
            )));
        }

        parse_languages_response(&body)
    }
}

impl Backend for GoogleBackend {
    fn name(&self) -> &'static str {
        "Google Translate"
    }

    fn translate(&self, text: &str, target_language: &str) -> Result<Outcome> {
        let url = format!("{}{}", self.base_url, TRANSLATE_PATH);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&translate_request(text, target_language))
            .send()
            .map_err(|e| Error::HttpError(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::HttpError(format!("Failed to read response: {}", e)))?;

        Ok(classify_response(status, &body))
    }
}

fn translate_request<'a>(text: &'a str, target_language: &'a str) -> TranslateRequest<'a> {
    TranslateRequest {
        q: text,
        target: target_language,
        format: "text",
    }
}

fn classify_response(status: StatusCode, body: &str) -> Outcome {
    if !status.is_success() {
        log::error!("Error translating text: {} {}", status, body);
        return Outcome::Unusable(format!("HTTP {}", status));
    }

    parse_translate_response(body)
}

fn parse_translate_response(body: &str) -> Outcome {
    match serde_json::from_str::<TranslateResponse>(body) {
        Ok(response) => match response.data.translations.into_iter().next() {
            Some(t) => Outcome::Translated(t.translated_text),
            None => Outcome::Unusable("response held no translations".to_string()),
        },
        Err(e) => Outcome::Unusable(format!("malformed response: {}", e)),
    }
}

fn parse_languages_response(body: &str) -> Result<Vec<String>> {
    let response: LanguagesResponse = serde_json::from_str(body)
        .map_err(|e| Error::ServiceError(format!("Malformed languages response: {}", e)))?;

    Ok(response
        .data
        .map(|d| d.languages.into_iter().map(|l| l.language).collect())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(translate_request("Hello World", "es")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"q": "Hello World", "target": "es", "format": "text"})
        );
    }

    #[test]
    fn test_parse_translate_response() {
        let body = r#"{"data":{"translations":[{"translatedText":"Hola Mundo","detectedSourceLanguage":"en"}]}}"#;
        assert_eq!(
            parse_translate_response(body),
            Outcome::Translated("Hola Mundo".to_string())
        );
    }

    #[test]
    fn test_parse_translate_response_unusable() {
        assert!(matches!(
            parse_translate_response(r#"{"data":{"translations":[]}}"#),
            Outcome::Unusable(_)
        ));
        assert!(matches!(
            parse_translate_response("<html>502 Bad Gateway</html>"),
            Outcome::Unusable(_)
        ));
        assert!(matches!(
            parse_translate_response(r#"{"error":{"code":400}}"#),
            Outcome::Unusable(_)
        ));
    }

    #[test]
    fn test_error_status_is_unusable() {
        let ok = r#"{"data":{"translations":[{"translatedText":"Hola"}]}}"#;
        assert_eq!(
            classify_response(StatusCode::OK, ok),
            Outcome::Translated("Hola".to_string())
        );

        let denied = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, denied),
            Outcome::Unusable("HTTP 403 Forbidden".to_string())
        );
        // A well-formed body does not rescue a failing status
        assert!(matches!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, ok),
            Outcome::Unusable(_)
        ));
    }

    #[test]
    fn test_parse_languages_response() {
        let body = r#"{"data":{"languages":[{"language":"af"},{"language":"es"},{"language":"zh-TW"}]}}"#;
        assert_eq!(
            parse_languages_response(body).unwrap(),
            vec!["af", "es", "zh-TW"]
        );
        assert!(parse_languages_response("{}").unwrap().is_empty());
        assert!(parse_languages_response("not json").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = GoogleBackend::new("key", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(backend.base_url, "http://localhost:8080");
    }
}
