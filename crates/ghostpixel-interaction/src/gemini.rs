//! GeminiCompletionProvider - REST client for the Gemini `generateContent` endpoint.
//!
//! The credential travels with each request, so one provider instance serves
//! whatever key the user has stored at the time of the exchange.

use async_trait::async_trait;
use ghostpixel_core::completion::{
    CompletionProvider, CompletionRequest, CompletionResponse, ConversationTurn,
};
use ghostpixel_core::config::CompletionConfig;
use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::message::MessageRole;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Completion provider backed by the Gemini HTTP API.
#[derive(Debug, Clone)]
pub struct GeminiCompletionProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiCompletionProvider {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GhostError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Points the provider at another endpoint root (e.g. a local mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    async fn send_request(
        &self,
        credential: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, credential)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                GhostError::provider(format!("Gemini API request failed: {}", err.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        response
            .json()
            .await
            .map_err(|err| {
                GhostError::provider(format!(
                    "Failed to parse Gemini response: {}",
                    err.without_url()
                ))
            })
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = GenerateContentRequest::from_request(&request);
        tracing::debug!(
            model = %self.model,
            turns = body.contents.len(),
            "Sending generateContent request"
        );

        let parsed = self.send_request(&request.credential, &body).await?;
        let response = extract_candidates(parsed);
        tracing::debug!(candidates = response.candidates.len(), "Gemini response received");
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Prior turns first, then the latest input. Without history the body is
    /// a single role-less user content.
    fn from_request(request: &CompletionRequest) -> Self {
        if request.history.is_empty() {
            return Self {
                contents: vec![Content::text(None, &request.prompt)],
            };
        }

        let mut contents: Vec<Content> = request.history.iter().map(Content::from_turn).collect();
        contents.push(Content::text(Some("user"), &request.prompt));
        Self { contents }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&'static str>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn from_turn(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };
        Self::text(Some(role), &turn.text)
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Keeps candidate order; a candidate without text contributes an empty string
/// so that "first candidate" still means the provider's first choice.
fn extract_candidates(response: GenerateContentResponse) -> CompletionResponse {
    let candidates = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .map(|candidate| {
            candidate
                .content
                .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
                .unwrap_or_default()
        })
        .collect();
    CompletionResponse { candidates }
}

fn map_http_error(status: StatusCode, body: String) -> GhostError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    GhostError::Provider {
        status_code: Some(status.as_u16()),
        message,
    }
}
