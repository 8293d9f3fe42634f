//! Pipeline stages for exam-paper analysis.
//!
//! Each submodule implements exactly one step; the
//! [`crate::session::UploadController`] sequences them and owns the state
//! between steps.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ compress ──▶ encode ──▶ analyze (postprocess + parse)
//! (path/URL)  (resize+JPEG) (base64)  (Gemini)
//! ```
//!
//! 1. [`input`]    — declare the content type and read the selected file
//! 2. [`compress`] — cap the width and re-encode as JPEG; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 3. [`encode`]   — base64-wrap the JPEG for the JSON request body
//! 4. [`analyze`]  — the single remote call; the only stage with network I/O
//!    besides URL inputs
//! 5. [`postprocess`] — strip packaging from the model text before parsing

pub mod analyze;
pub mod compress;
pub mod encode;
pub mod input;
pub mod postprocess;
