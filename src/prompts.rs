//! Instruction prompt and response schema for exam-paper analysis.
//!
//! Both live here so a prompt or schema change touches exactly one file and
//! unit tests can inspect them without a model in the loop.

use serde_json::{json, Value};

/// Instruction sent alongside the paper image.
pub const EXAM_ANALYSIS_PROMPT: &str = r#"You are an expert academic assistant. Analyze this image of an exam guess paper (it may be in English, Hindi, or both).

1. Extract all text accurately, preserving the structure (Question numbers, sections).
2. Identify the primary language(s).
3. Provide a brief summary of the paper's focus.
4. List 3-5 key topics covered.
5. Pick the most important 2-3 questions and provide concise, expert-level answers/explanations."#;

/// Fields the model must always return.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "text",
    "language",
    "summary",
    "keyTopics",
    "suggestedSolutions",
];

/// Gemini `responseSchema` constraining the model output to an
/// [`crate::model::AnalysisResult`].
///
/// Uses the OpenAPI-subset type names (`OBJECT`, `STRING`, `ARRAY`) that the
/// `generateContent` endpoint expects.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "text": { "type": "STRING", "description": "The full extracted text" },
            "language": { "type": "STRING", "description": "Detected language(s)" },
            "summary": { "type": "STRING", "description": "Brief summary of the paper" },
            "keyTopics": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of main topics"
            },
            "suggestedSolutions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "answer": { "type": "STRING" }
                    },
                    "required": ["question", "answer"]
                }
            }
        },
        "required": REQUIRED_FIELDS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_all_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_FIELDS);
        for field in REQUIRED_FIELDS {
            assert!(schema["properties"].get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn solution_items_require_question_and_answer() {
        let schema = response_schema();
        let items = &schema["properties"]["suggestedSolutions"]["items"];
        assert_eq!(items["type"], "OBJECT");
        assert_eq!(items["required"], json!(["question", "answer"]));
    }

    #[test]
    fn prompt_asks_for_topics_and_solutions() {
        assert!(EXAM_ANALYSIS_PROMPT.contains("3-5 key topics"));
        assert!(EXAM_ANALYSIS_PROMPT.contains("2-3 questions"));
        assert!(EXAM_ANALYSIS_PROMPT.contains("Hindi"));
    }
}
