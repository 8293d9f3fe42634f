//! Error type for the examquest library.
//!
//! Every failure in the upload pipeline ends the current session, so a
//! single fatal enum is enough. [`ExamQuestError`] is what the library returns
//! from every fallible call. [`ExamQuestError::user_message`] maps it to the
//! short text a user sees in the `error` state.
//!
//! The `Display` text is for logs and carries full detail. The user message
//! deliberately does not: parse failures in particular are reported with one
//! uniform sentence regardless of what serde complained about.

use std::path::PathBuf;
use thiserror::Error;

/// Shown when the selected file does not declare an `image/*` content type.
pub const INVALID_FILE_MESSAGE: &str = "Please select a valid image file.";

/// Shown when the remote model answered but its body could not be parsed.
pub const UNPARSABLE_RESPONSE_MESSAGE: &str =
    "Failed to parse AI response. The image might be unclear.";

/// Shown when the selected file could not be read into memory.
pub const READ_FAILED_MESSAGE: &str = "Failed to read the selected file.";

/// Shown when the image bytes are not a decodable image.
pub const DECODE_FAILED_MESSAGE: &str = "The selected image could not be decoded.";

/// Fallback for failures with no better description.
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred during processing.";

/// All errors returned by the examquest library.
#[derive(Debug, Error)]
pub enum ExamQuestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared content type is not `image/*`.
    #[error("Unsupported file type '{content_type}': expected an image/* content type")]
    InvalidFileType { content_type: String },

    /// The selected file could not be read.
    #[error("Failed to read '{name}': {reason}")]
    ReadFailed { name: String, reason: String },

    /// A URL input could not be fetched.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Compression errors ───────────────────────────────────────────────
    /// The input bytes are not a decodable image.
    #[error("Image decode failed: {detail}")]
    ImageDecodeFailed { detail: String },

    /// Re-encoding the resized image failed.
    #[error("Image encode failed: {detail}")]
    ImageEncodeFailed { detail: String },

    // ── Remote model errors ──────────────────────────────────────────────
    /// The analyzer is not configured (missing API key etc.).
    #[error("AI provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// Network or transport failure talking to the model.
    #[error("{message}")]
    Transport { message: String },

    /// The model service answered with an error status.
    #[error("{message}")]
    RemoteService { status: u16, message: String },

    /// The model answered, but the body did not match the expected schema.
    #[error("Failed to parse AI response. The image might be unclear.")]
    UnparsableResponse,

    /// The remote call exceeded the configured timeout.
    #[error("The AI service did not respond within {secs}s.")]
    Timeout { secs: u64 },

    /// The session was cancelled while the remote call was in flight.
    #[error("Analysis cancelled")]
    Cancelled,

    // ── Config / output errors ───────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not write the rendered result.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExamQuestError {
    /// The message stored in a failed session and shown to the user.
    ///
    /// Remote and transport failures pass their underlying message through
    /// verbatim; everything else maps to a fixed sentence.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidFileType { .. } => INVALID_FILE_MESSAGE.to_string(),
            Self::ReadFailed { .. } | Self::DownloadFailed { .. } => {
                READ_FAILED_MESSAGE.to_string()
            }
            Self::ImageDecodeFailed { .. } => DECODE_FAILED_MESSAGE.to_string(),
            Self::UnparsableResponse => UNPARSABLE_RESPONSE_MESSAGE.to_string(),
            Self::Transport { message } | Self::RemoteService { message, .. } => {
                if message.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            Self::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Flatten an error and its `source()` chain into one `": "`-joined line.
///
/// reqwest's top-level `Display` omits the cause (refused connection, DNS,
/// TLS), which only shows up further down the chain.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut last = message.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !last.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        last = text;
        source = cause.source();
    }
    message
}
