//! Gemini `generateContent` client with Google Search grounding.
//!
//! Behaviour:
//! - Sends the full running history plus the new prompt on every call; the
//!   service keeps no conversation state.
//! - Adds the persona system instruction with today's date and enables the
//!   `google_search` tool.
//! - Extracts the reply text and the grounding web references.
//! - Through [`GenerationProvider`], every failure becomes the fixed apology.

use std::time::Duration;

use chrono::Local;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::chat::core::config::ProviderConfig;
use crate::chat::core::message::MessageSource;
use crate::llm::persona;
use crate::llm::provider::{
    EMPTY_REPLY_TEXT, GenerateFuture, Generation, GenerationProvider, HistoryEntry, HistoryRole,
};

/// Header carrying the API credential.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors produced by the Gemini client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// No credential configured.
    #[error("gemini api key is not configured")]
    ApiKeyRequired,
    /// Transport or decode failure.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("gemini returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the service, or the raw body.
        message: String,
    },
    /// Endpoint could not be built.
    #[error("invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GeminiError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => matches!(*status, 429 | 500 | 502 | 503 | 504),
            Self::ApiKeyRequired | Self::InvalidUrl(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

impl Content {
    fn turn(role: HistoryRole, text: &str) -> Self {
        Self {
            role: Some(role.as_str()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Default, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Default, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebReference>,
}

#[derive(Debug, Default, Deserialize)]
struct WebReference {
    uri: Option<String>,
    title: Option<String>,
}

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    config: ProviderConfig,
}

impl GeminiClient {
    /// Create a client from provider configuration.
    ///
    /// A missing API key is accepted here; calls then fail with
    /// [`GeminiError::ApiKeyRequired`].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Model this client talks to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Endpoint URL for `generateContent` on the configured model.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn endpoint(&self) -> Result<Url, GeminiError> {
        let base = self.config.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/models/{model}:generateContent",
            model = self.config.model
        ))?)
    }

    /// Perform one generation call, surfacing failures.
    ///
    /// # Errors
    /// Returns an error if the key is missing, the request fails, or the
    /// service answers with a non-success status.
    pub async fn try_generate(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
    ) -> Result<Generation, GeminiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(GeminiError::ApiKeyRequired)?;

        let instruction = persona::system_instruction(Local::now().date_naive());
        let request = build_request(prompt, history, &instruction, self.config.temperature);

        debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            "sending generateContent"
        );

        let response = self
            .client
            .post(self.endpoint()?)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: GenerateContentResponse = response.json().await?;
        Ok(extract_generation(body))
    }
}

impl GenerationProvider for GeminiClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [HistoryEntry],
    ) -> GenerateFuture<'a, Generation> {
        Box::pin(async move {
            match self.try_generate(prompt, history).await {
                Ok(generation) => generation,
                Err(err) => {
                    error!(retryable = err.is_retryable(), "Gemini API error: {err}");
                    Generation::apology()
                }
            }
        })
    }
}

/// Assemble the request body.
///
/// `contents` is the history followed by the prompt as a user turn, unless the
/// history already ends with that exact user turn.
fn build_request(
    prompt: &str,
    history: &[HistoryEntry],
    instruction: &str,
    temperature: f64,
) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|entry| Content::turn(entry.role, &entry.text))
        .collect();

    let prompt_already_sent = history
        .last()
        .is_some_and(|last| last.role == HistoryRole::User && last.text == prompt);
    if !prompt_already_sent {
        contents.push(Content::turn(HistoryRole::User, prompt));
    }

    GenerateContentRequest {
        contents,
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: instruction.to_string(),
            }],
        },
        generation_config: GenerationConfig { temperature },
        tools: vec![Tool::default()],
    }
}

/// Pull reply text and grounding sources out of a response.
fn extract_generation(response: GenerateContentResponse) -> Generation {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Generation {
            text: EMPTY_REPLY_TEXT.to_string(),
            sources: Vec::new(),
        };
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let sources = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| MessageSource::new(web.title?, web.uri?))
                .collect()
        })
        .unwrap_or_default();

    Generation {
        text: if text.is_empty() {
            EMPTY_REPLY_TEXT.to_string()
        } else {
            text
        },
        sources,
    }
}

fn status_error(status: StatusCode, body: &str) -> GeminiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|err| err.get("message"))
                .and_then(|msg| msg.as_str())
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    GeminiError::Status {
        status: status.as_u16(),
        message,
    }
}
