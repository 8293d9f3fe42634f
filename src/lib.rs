//! # examquest
//!
//! Analyse a photographed exam "guess paper" with a multimodal LLM.
//!
//! A photo goes in; out comes the full extracted text, the detected
//! language, a short summary, the key topics, and expert answers to the most
//! important questions. The model (Google Gemini by default) is asked to
//! answer against a strict JSON schema, and anything that does not parse is
//! rejected with one uniform error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image file
//!  │
//!  ├─ 1. Upload    read the local file, URL or buffer into memory
//!  ├─ 2. Compress  cap width at 1200 px, re-encode as JPEG q80 (spawn_blocking)
//!  ├─ 3. Encode    JPEG → base64 ImageData
//!  ├─ 4. Analyze   one generateContent call with prompt + response schema
//!  └─ 5. Render    insights + "Smart Solutions" / "Extracted Text" tabs
//! ```
//!
//! Steps 1–4 are driven by [`UploadController`], a state machine whose
//! single [`SessionState`] value makes illegal combinations (a result *and*
//! an error, say) unrepresentable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use examquest::{AnalysisConfig, SelectedFile, UploadController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY / API_KEY
//!     let config = AnalysisConfig::default();
//!     let mut controller = UploadController::from_config(config)?;
//!     let result = controller.select(SelectedFile::from_path("paper.jpg")).await?;
//!     println!("{}", result.summary.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without the network
//!
//! Implement [`ExamAnalyzer`] with a canned response and hand it to
//! [`UploadController::new`]; the real model is never needed.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `examquest` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::ExamQuestError;
pub use model::{AnalysisResult, SuggestedSolution};
pub use pipeline::analyze::{parse_analysis, ExamAnalyzer, GeminiAnalyzer};
pub use pipeline::compress::{compress, CompressedImage};
pub use pipeline::encode::ImageData;
pub use pipeline::input::{FileSource, SelectedFile};
pub use progress::{NoopObserver, ObserverHandle, SessionObserver};
pub use render::{render, write_output, OutputFormat, ResultTab};
pub use session::{CancelHandle, SessionState, SessionStatus, UploadController, UploadSession};
