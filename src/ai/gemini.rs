//! HTTP client for the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use super::{AiError, TextGenerator};
use crate::config::AiOptions;

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from the `[ai]` config section. Fails with
    /// [`AiError::NotConfigured`] when the key variable is unset or blank.
    pub fn from_config(options: &AiOptions) -> Result<Self, AiError> {
        let api_key = options
            .api_key()
            .ok_or_else(|| AiError::NotConfigured(options.api_key_env.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout())
            .build()?;
        Ok(Self::with_client(
            client,
            options.endpoint.clone(),
            options.model.clone(),
            api_key,
        ))
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: String,
        model: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            model,
            api_key,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        tracing::debug!(model = %self.model, "sending generateContent request");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        extract_text(&raw)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(raw: &str) -> Result<String, AiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(raw).map_err(|err| AiError::Decode(err.to_string()))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn joins_parts_of_first_candidate() {
        let raw = r#"{"candidates":[
            {"content":{"parts":[{"text":"Hello, "},{"text":"world"}],"role":"model"}},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        assert_eq!(extract_text(raw).expect("text"), "Hello, world");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        assert_matches!(extract_text(r#"{"candidates":[]}"#), Err(AiError::EmptyResponse));
        assert_matches!(
            extract_text(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
            Err(AiError::EmptyResponse)
        );
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert_matches!(extract_text("<html>"), Err(AiError::Decode(_)));
    }

    #[test]
    fn url_targets_configured_model() {
        let client = GeminiClient::with_client(
            reqwest::Client::new(),
            "https://example.test/".into(),
            "gemini-3-flash-preview".into(),
            "key".into(),
        );
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn missing_key_is_not_configured() {
        let options = AiOptions {
            api_key_env: "ZENNOTE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..AiOptions::default()
        };
        assert_matches!(
            GeminiClient::from_config(&options),
            Err(AiError::NotConfigured(var)) if var == "ZENNOTE_TEST_KEY_THAT_IS_NEVER_SET"
        );
    }
}
