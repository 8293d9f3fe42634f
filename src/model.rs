//! Structured analysis returned by the remote model.
//!
//! Field names serialise in camelCase so the same types describe both the
//! wire payload (`keyTopics`, `suggestedSolutions`) and the `--format json`
//! output of the CLI.

use serde::{Deserialize, Serialize};

/// The schema-validated analysis of one exam paper image.
///
/// `key_topics` and `suggested_solutions` keep the order the model returned
/// them in, which is treated as relevance order. Both may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Full extracted text, structure preserved.
    pub text: String,

    /// Detected language label, e.g. "English", "Hindi, English".
    pub language: String,

    /// Brief summary of the paper's focus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub key_topics: Vec<String>,

    #[serde(default)]
    pub suggested_solutions: Vec<SuggestedSolution>,
}

/// One question picked from the paper with a model-written answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedSolution {
    pub question: String,
    pub answer: String,
}
