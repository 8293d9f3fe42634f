//! Upload session state machine.
//!
//! ```text
//!            select(non-image)
//!   Idle ────────────────────────────────────────────┐
//!    │ select(image)                                 ▼
//!    ▼                                             Error
//!  Uploading ──read──▶ Compressing ──resize──▶ Analyzing ──▶ Completed
//!    │                    │                       │  │
//!    └──── read failed ───┴──── decode failed ────┘  └── cancel ──▶ Idle
//! ```
//!
//! The whole session is one [`SessionState`] value, so a result can only
//! exist in `Completed` and an error message only in `Failed`. Every failure
//! is terminal; [`UploadController::reset`] is the only way back to `Idle`
//! (selecting a new file while terminal resets implicitly).

use crate::config::AnalysisConfig;
use crate::error::ExamQuestError;
use crate::model::AnalysisResult;
use crate::pipeline::analyze::{ExamAnalyzer, GeminiAnalyzer};
use crate::pipeline::compress::compress_async;
use crate::pipeline::encode::{encode_image, ImageData};
use crate::pipeline::input::SelectedFile;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Coarse session status, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Uploading,
    Compressing,
    Analyzing,
    Completed,
    Error,
}

impl SessionStatus {
    /// `Completed` and `Error` stay put until reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Progress reported on entering this status. `Error` keeps whatever the
    /// session had reached.
    fn progress_floor(self) -> u8 {
        match self {
            Self::Idle | Self::Error => 0,
            Self::Uploading => 10,
            Self::Compressing => 35,
            Self::Analyzing => 60,
            Self::Completed => 100,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Compressing => "compressing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Session state with the data each stage owns.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Uploading {
        file_name: String,
    },
    Compressing {
        file_name: String,
        source_len: usize,
    },
    Analyzing {
        file_name: String,
        image: ImageData,
    },
    Completed {
        file_name: String,
        image: ImageData,
        result: AnalysisResult,
    },
    Failed {
        /// Stage that was running when the failure happened.
        during: SessionStatus,
        message: String,
    },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::Uploading { .. } => SessionStatus::Uploading,
            Self::Compressing { .. } => SessionStatus::Compressing,
            Self::Analyzing { .. } => SessionStatus::Analyzing,
            Self::Completed { .. } => SessionStatus::Completed,
            Self::Failed { .. } => SessionStatus::Error,
        }
    }
}

/// One upload-through-result cycle.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    state: SessionState,
    progress: u8,
}

impl UploadSession {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// 0–100, never decreasing until reset.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Set only in `Completed`.
    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            SessionState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Set only in `Failed`.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The compressed image, once compression has finished.
    pub fn image(&self) -> Option<&ImageData> {
        match &self.state {
            SessionState::Analyzing { image, .. } | SessionState::Completed { image, .. } => {
                Some(image)
            }
            _ => None,
        }
    }

    /// A pipeline step is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(
            self.status(),
            SessionStatus::Idle | SessionStatus::Completed | SessionStatus::Error
        )
    }
}

// ── Cancellation ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancels the session of the controller it came from.
///
/// Cheap to clone and safe to trigger from another task (e.g. a Ctrl-C
/// handler). Cancelling an idle or terminal session is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    /// Run `fut` unless cancelled first; `None` means cancelled.
    async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = &mut notified => None,
            out = fut => Some(out),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────

/// Drives one [`UploadSession`] through the pipeline.
pub struct UploadController {
    analyzer: Arc<dyn ExamAnalyzer>,
    config: AnalysisConfig,
    session: UploadSession,
    cancel: CancelHandle,
}

impl fmt::Debug for UploadController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadController")
            .field("analyzer", &self.analyzer.name())
            .field("config", &self.config)
            .field("session", &self.session)
            .finish()
    }
}

impl UploadController {
    pub fn new(analyzer: Arc<dyn ExamAnalyzer>, config: AnalysisConfig) -> Self {
        Self {
            analyzer,
            config,
            session: UploadSession::default(),
            cancel: CancelHandle::default(),
        }
    }

    /// Controller backed by [`GeminiAnalyzer`].
    pub fn from_config(config: AnalysisConfig) -> Result<Self, ExamQuestError> {
        let analyzer = GeminiAnalyzer::from_config(&config)?;
        Ok(Self::new(Arc::new(analyzer), config))
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Handle that cancels whatever session this controller is running.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Return to a clean `Idle` session. Always succeeds.
    ///
    /// A cancel requested while the session is idle stays pending and stops
    /// the next [`select`](Self::select) before it does any work; only a
    /// reset drops it.
    pub fn reset(&mut self) {
        self.session = UploadSession::default();
        self.cancel.clear();
        debug!("Session reset");
        self.config
            .observer
            .on_transition(SessionStatus::Idle, self.session.progress);
    }

    /// Run the whole pipeline for `file`.
    ///
    /// On success the session is `Completed` and a copy of the result is
    /// returned. On failure the session is `Error` (or `Idle` after a
    /// cancel) and the error is returned.
    pub async fn select(&mut self, file: SelectedFile) -> Result<AnalysisResult, ExamQuestError> {
        if self.session.status() != SessionStatus::Idle {
            self.reset();
        }

        // The only input validation, and it happens before any I/O.
        if !file.is_image() {
            return Err(self.fail(
                SessionStatus::Idle,
                ExamQuestError::InvalidFileType {
                    content_type: file.content_type.clone(),
                },
            ));
        }

        let file_name = file.name.clone();
        info!("Processing '{}' ({})", file_name, file.content_type);

        // ── Uploading: read the file into memory ─────────────────────────
        self.transition(SessionState::Uploading {
            file_name: file_name.clone(),
        });
        let download_timeout = self.config.download_timeout_secs;
        let source = match self.cancel.run(file.read(download_timeout)).await {
            None => return Err(self.cancelled()),
            Some(Err(e)) => return Err(self.fail(SessionStatus::Uploading, e)),
            Some(Ok(bytes)) => bytes,
        };

        // ── Compressing: resize + re-encode ──────────────────────────────
        self.transition(SessionState::Compressing {
            file_name: file_name.clone(),
            source_len: source.len(),
        });
        let (max_width, quality) = (self.config.max_width, self.config.jpeg_quality);
        let compressed = match self
            .cancel
            .run(compress_async(source, max_width, quality))
            .await
        {
            None => return Err(self.cancelled()),
            Some(Err(e)) => return Err(self.fail(SessionStatus::Compressing, e)),
            Some(Ok(img)) => img,
        };
        info!(
            "Compressed to {}x{} ({} bytes)",
            compressed.width,
            compressed.height,
            compressed.bytes.len()
        );
        let image = encode_image(&compressed);

        // ── Analyzing: the single remote call ────────────────────────────
        self.transition(SessionState::Analyzing {
            file_name: file_name.clone(),
            image: image.clone(),
        });
        let secs = self.config.api_timeout_secs;
        let call = tokio::time::timeout(Duration::from_secs(secs), self.analyzer.analyze(&image));
        let outcome = match self.cancel.run(call).await {
            None => return Err(self.cancelled()),
            Some(Err(_elapsed)) => Err(ExamQuestError::Timeout { secs }),
            Some(Ok(res)) => res,
        };

        match outcome {
            Ok(result) => {
                info!(
                    "Analysis complete: {} topics, {} solutions",
                    result.key_topics.len(),
                    result.suggested_solutions.len()
                );
                self.transition(SessionState::Completed {
                    file_name,
                    image,
                    result: result.clone(),
                });
                Ok(result)
            }
            Err(e) => Err(self.fail(SessionStatus::Analyzing, e)),
        }
    }

    fn transition(&mut self, state: SessionState) {
        let status = state.status();
        self.session.progress = self.session.progress.max(status.progress_floor());
        self.session.state = state;
        debug!("Session → {} ({}%)", status, self.session.progress);
        self.config
            .observer
            .on_transition(status, self.session.progress);
    }

    fn fail(&mut self, during: SessionStatus, err: ExamQuestError) -> ExamQuestError {
        let message = err.user_message();
        error!("Session failed while {}: {}", during, err);
        self.transition(SessionState::Failed {
            during,
            message: message.clone(),
        });
        self.config.observer.on_error(&message);
        err
    }

    fn cancelled(&mut self) -> ExamQuestError {
        info!("Session cancelled");
        self.reset();
        ExamQuestError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(!SessionStatus::Analyzing.is_terminal());
        assert!(!SessionStatus::Idle.is_terminal());
    }

    #[test]
    fn default_session_is_clean_idle() {
        let s = UploadSession::default();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.progress(), 0);
        assert!(s.result().is_none());
        assert!(s.error_message().is_none());
        assert!(!s.is_busy());
    }

    #[test]
    fn failed_state_exposes_only_message() {
        let s = UploadSession {
            state: SessionState::Failed {
                during: SessionStatus::Analyzing,
                message: "boom".into(),
            },
            progress: 60,
        };
        assert_eq!(s.error_message(), Some("boom"));
        assert!(s.result().is_none());
        assert!(s.image().is_none());
    }

    #[test]
    fn status_display() {
        assert_eq!(SessionStatus::Analyzing.to_string(), "analyzing");
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[tokio::test]
    async fn cancel_before_run_short_circuits() {
        let handle = CancelHandle::default();
        handle.cancel();
        assert!(handle.run(async { 1 }).await.is_none());
        handle.clear();
        assert_eq!(handle.run(async { 1 }).await, Some(1));
    }
}
