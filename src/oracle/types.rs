//! Shared data types for classifier responses and invocation metrics.
use serde::{Deserialize, Serialize};

/// A single changelog entry returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub pr_number: u64,
    pub category: String,
    pub description: String,
    /// How strongly the entry belongs in the changelog, 0-100.
    pub include_score: i64,
    /// Relative importance within its category, 0-100.
    pub importance_score: i64,
    #[serde(default)]
    pub reused_from_history: bool,
    /// Filled by joining back to the collected records; not part of the
    /// model response.
    #[serde(skip)]
    pub author: String,
}

/// The structured response from the classification model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub changes: Vec<ChangeEntry>,
}

/// Metadata about a model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDetails {
    pub version: String,
    pub timestamp: String,
    pub model: String,
    pub latency_seconds: f64,
    pub prompt_tokens: i64,
    pub candidates_tokens: i64,
    pub total_tokens: i64,
    pub estimated_cost_usd: f64,
}
