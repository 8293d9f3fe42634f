//! Remote analysis: send the compressed paper image to a multimodal model and
//! parse its structured answer.
//!
//! The model sits behind the [`ExamAnalyzer`] trait so the session can be
//! driven by a deterministic stub in tests; [`GeminiAnalyzer`] is the real
//! implementation over the Gemini `generateContent` REST endpoint.
//!
//! ## One call, no retries
//!
//! Each session issues exactly one request. Transport and service errors are
//! propagated with their message; a body that does not parse into an
//! [`AnalysisResult`] becomes [`ExamQuestError::UnparsableResponse`], with the
//! serde detail going to the log only.

use super::encode::ImageData;
use super::postprocess::clean_response;
use crate::config::AnalysisConfig;
use crate::error::{error_chain, ExamQuestError};
use crate::model::AnalysisResult;
use crate::prompts::{response_schema, EXAM_ANALYSIS_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything that can turn a paper image into an [`AnalysisResult`].
#[async_trait]
pub trait ExamAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImageData) -> Result<AnalysisResult, ExamQuestError>;

    /// Short label for logs.
    fn name(&self) -> &str {
        "analyzer"
    }
}

/// Parse the model's text payload into an [`AnalysisResult`].
///
/// The payload is untrusted: it is cleaned of packaging (fences, BOM) and must
/// then deserialize as a whole. Any failure collapses to
/// [`ExamQuestError::UnparsableResponse`].
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ExamQuestError> {
    let cleaned = clean_response(raw);
    serde_json::from_str::<AnalysisResult>(&cleaned).map_err(|e| {
        warn!("Model response did not match the analysis schema: {}", e);
        ExamQuestError::UnparsableResponse
    })
}

// ── Gemini wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Build the `generateContent` request body for one image.
pub fn build_request_body(image: &ImageData, temperature: Option<f32>) -> Value {
    let request = GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: &image.mime_type,
                        data: &image.data,
                    },
                },
                Part::Text {
                    text: EXAM_ANALYSIS_PROMPT,
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            temperature,
        },
    };
    // Serialising plain structs of strings and a Value cannot fail.
    serde_json::to_value(&request).unwrap_or(Value::Null)
}

/// Pull the answer text out of a successful `generateContent` body.
///
/// Thought parts are skipped; the remaining text parts of the first
/// candidate are concatenated.
pub fn extract_candidate_text(body: &str) -> Result<String, ExamQuestError> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        warn!("generateContent body is not valid JSON: {}", e);
        ExamQuestError::UnparsableResponse
    })?;

    if let Some(usage) = &response.usage_metadata {
        debug!(
            "{} input tokens, {} output tokens",
            usage.prompt_token_count, usage.candidates_token_count
        );
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        warn!("generateContent returned no candidates");
        ExamQuestError::UnparsableResponse
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        warn!(
            "Candidate carried no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
        return Err(ExamQuestError::UnparsableResponse);
    }
    Ok(text)
}

/// Human-readable message for a non-2xx response.
pub fn extract_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.message.trim().is_empty() => env.error.message,
        _ if !body.trim().is_empty() => format!("HTTP {status}: {}", body.trim()),
        _ => format!("HTTP {status}"),
    }
}

// ── Gemini client ────────────────────────────────────────────────────────

/// [`ExamAnalyzer`] backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAnalyzer")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiAnalyzer {
    /// Build from config, resolving the API key from the environment if needed.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ExamQuestError> {
        let api_key =
            config
                .resolve_api_key()
                .ok_or_else(|| ExamQuestError::ProviderNotConfigured {
                    hint: "Set GEMINI_API_KEY (or API_KEY) to your Google AI Studio key.".into(),
                })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ExamQuestError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            temperature: config.temperature,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ExamAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &ImageData) -> Result<AnalysisResult, ExamQuestError> {
        let start = Instant::now();
        info!("Sending {} image to {}", image.mime_type, self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request_body(image, self.temperature))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExamQuestError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ExamQuestError::Transport {
                        message: error_chain(&e),
                    }
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExamQuestError::Transport {
                message: error_chain(&e),
            })?;

        if !status.is_success() {
            let message = extract_error_message(status.as_u16(), &body);
            warn!("{} returned {}: {}", self.model, status, message);
            return Err(ExamQuestError::RemoteService {
                status: status.as_u16(),
                message,
            });
        }

        let text = extract_candidate_text(&body)?;
        let result = parse_analysis(&text)?;
        debug!(
            "Analysis parsed in {:?}: {} topics, {} solutions",
            start.elapsed(),
            result.key_topics.len(),
            result.suggested_solutions.len()
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
