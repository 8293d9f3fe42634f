//! Presentation of an [`AnalysisResult`].
//!
//! The result is laid out as an insights block
//! (language, summary, key topics) followed by one or both tabs, "Smart
//! Solutions" and "Extracted Text". Empty topic and solution lists render an
//! explicit message instead of nothing.

use crate::error::ExamQuestError;
use crate::model::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Shown when the model returned no key topics.
pub const NO_TOPICS_MESSAGE: &str = "No key topics identified.";

/// Shown when the model returned no question/answer pairs.
pub const NO_SOLUTIONS_MESSAGE: &str = "No questions detected for solutions.";

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Plain terminal text (default).
    #[default]
    Text,
    Markdown,
    /// The raw [`AnalysisResult`] as pretty JSON; tab selection is ignored.
    Json,
}

/// Which result tab(s) to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultTab {
    /// Insights + "Smart Solutions" (default).
    #[default]
    Analysis,
    /// Insights + "Extracted Text".
    Text,
    /// Insights + both tabs.
    All,
}

/// Render `result` in the requested format.
pub fn render(result: &AnalysisResult, format: OutputFormat, tab: ResultTab) -> String {
    match format {
        OutputFormat::Json => {
            // A struct of strings always serialises.
            serde_json::to_string_pretty(result).unwrap_or_default() + "\n"
        }
        OutputFormat::Markdown => render_markdown(result, tab),
        OutputFormat::Text => render_text(result, tab),
    }
}

fn shows_solutions(tab: ResultTab) -> bool {
    matches!(tab, ResultTab::Analysis | ResultTab::All)
}

fn shows_text(tab: ResultTab) -> bool {
    matches!(tab, ResultTab::Text | ResultTab::All)
}

fn summary_of(result: &AnalysisResult) -> Option<&str> {
    result
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ── Markdown ─────────────────────────────────────────────────────────────

fn render_markdown(result: &AnalysisResult, tab: ResultTab) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Insights\n");
    let _ = writeln!(out, "**Language:** {}\n", result.language.to_uppercase());
    if let Some(summary) = summary_of(result) {
        let _ = writeln!(out, "{summary}\n");
    }

    let _ = writeln!(out, "## Key Topics\n");
    if result.key_topics.is_empty() {
        let _ = writeln!(out, "_{NO_TOPICS_MESSAGE}_\n");
    } else {
        for topic in &result.key_topics {
            let _ = writeln!(out, "- {topic}");
        }
        out.push('\n');
    }

    if shows_solutions(tab) {
        let _ = writeln!(out, "## Smart Solutions\n");
        if result.suggested_solutions.is_empty() {
            let _ = writeln!(out, "_{NO_SOLUTIONS_MESSAGE}_\n");
        }
        for (i, item) in result.suggested_solutions.iter().enumerate() {
            let _ = writeln!(out, "### {}. {}\n", i + 1, item.question);
            let _ = writeln!(out, "{}\n", item.answer);
        }
    }

    if shows_text(tab) {
        let _ = writeln!(out, "## Extracted Text\n");
        let _ = writeln!(out, "_Raw Output ({})_\n", result.language);
        let _ = writeln!(out, "```text\n{}\n```\n", result.text.trim_end());
    }

    finish(out)
}

// ── Plain text ───────────────────────────────────────────────────────────

fn render_text(result: &AnalysisResult, tab: ResultTab) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "INSIGHTS");
    let _ = writeln!(out, "  Language: {}", result.language.to_uppercase());
    if let Some(summary) = summary_of(result) {
        let _ = writeln!(out, "  Summary:  {summary}");
    }
    if result.key_topics.is_empty() {
        let _ = writeln!(out, "  Topics:   {NO_TOPICS_MESSAGE}");
    } else {
        let _ = writeln!(out, "  Topics:   {}", result.key_topics.join(" · "));
    }

    if shows_solutions(tab) {
        let _ = writeln!(out, "\nSMART SOLUTIONS");
        if result.suggested_solutions.is_empty() {
            let _ = writeln!(out, "  {NO_SOLUTIONS_MESSAGE}");
        }
        for (i, item) in result.suggested_solutions.iter().enumerate() {
            let _ = writeln!(out, "\n  {:>2}. {}", i + 1, item.question);
            for line in item.answer.lines() {
                let _ = writeln!(out, "      {line}");
            }
        }
    }

    if shows_text(tab) {
        let _ = writeln!(out, "\nEXTRACTED TEXT  (Raw Output: {})", result.language);
        let _ = writeln!(out, "{}", result.text.trim_end());
    }

    finish(out)
}

fn finish(out: String) -> String {
    format!("{}\n", out.trim_end())
}

/// Write rendered output to `path` atomically (temp file, then rename).
pub async fn write_output(path: &Path, content: &str) -> Result<(), ExamQuestError> {
    let write_err = |source| ExamQuestError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
