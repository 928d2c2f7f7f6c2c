//! Implements the Oracle trait for the Gemini API
use async_trait::async_trait;
use chrono::Local;
use log::*;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use url::Url;

use crate::{
    error::{RelogError, Result},
    oracle::{
        traits::Oracle,
        types::{ModelDetails, ModelResponse},
    },
};

/// Base URL of the Gemini generateContent endpoint.
pub const GEMINI_API_BASE: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";

const TEMPERATURE: f32 = 0.2;

// Gemini 2.5 Flash paid tier pricing: $0.075 per 1M prompt tokens,
// $0.30 per 1M output tokens.
const PROMPT_COST_PER_TOKEN: f64 = 0.075 / 1_000_000.0;
const OUTPUT_COST_PER_TOKEN: f64 = 0.30 / 1_000_000.0;

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: i64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: i64,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: i64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

/// Gemini implementation of the classification oracle, calling the
/// generateContent REST endpoint with JSON response mode.
pub struct GeminiOracle {
    api_key: SecretString,
    client: Client,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn classify(
        &self,
        prompt: &str,
        release: &str,
        model: &str,
    ) -> Result<(ModelResponse, ModelDetails)> {
        let mut endpoint = Url::parse(&format!(
            "{}/{}:generateContent",
            self.base_url, model
        ))?;
        endpoint
            .query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json".to_string(),
            },
        };

        let started = Instant::now();

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let raw = response.text().await?;
        let latency = started.elapsed().as_secs_f64();

        let body: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|err| {
                RelogError::oracle(format!(
                    "failed to decode API response: {}",
                    err
                ))
            })?;

        let Some(candidate) = body.candidates.first() else {
            return Err(RelogError::oracle("no response from model"));
        };

        if candidate.content.parts.is_empty() {
            return Err(RelogError::oracle("no response from model"));
        }

        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();

        let parsed: ModelResponse =
            serde_json::from_str(&text).map_err(|err| {
                RelogError::oracle(format!(
                    "failed to parse model response: {}\nResponse: {}",
                    err, text
                ))
            })?;

        let mut prompt_tokens = 0;
        let mut candidates_tokens = 0;
        let mut total_tokens = 0;

        if let Some(usage) = body.usage_metadata {
            prompt_tokens = usage.prompt_token_count;
            candidates_tokens = usage.candidates_token_count;
            total_tokens = usage.total_token_count;
        }

        let estimated_cost_usd = prompt_tokens as f64 * PROMPT_COST_PER_TOKEN
            + candidates_tokens as f64 * OUTPUT_COST_PER_TOKEN;

        debug!(
            "model usage: prompt {} tokens, output {} tokens",
            prompt_tokens, candidates_tokens
        );

        let details = ModelDetails {
            version: release.to_string(),
            timestamp: Local::now().format("%Y%m%d-%H%M%S").to_string(),
            model: model.to_string(),
            latency_seconds: latency,
            prompt_tokens,
            candidates_tokens,
            total_tokens,
            estimated_cost_usd,
        };

        Ok((parsed, details))
    }
}
