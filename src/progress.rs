//! Observer trait for upload-session transitions.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::config::AnalysisConfigBuilder::observer`] to be told whenever the
//! [`crate::session::UploadController`] moves between states.
//!
//! # Example
//!
//! ```rust
//! use examquest::{AnalysisConfig, SessionObserver, SessionStatus};
//! use std::sync::Arc;
//!
//! struct PrintObserver;
//!
//! impl SessionObserver for PrintObserver {
//!     fn on_transition(&self, status: SessionStatus, progress: u8) {
//!         eprintln!("{status} ({progress}%)");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .observer(Arc::new(PrintObserver) as Arc<dyn SessionObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::session::SessionStatus;
use std::sync::Arc;

/// Receives session state changes.
///
/// All methods default to no-ops so implementations only override what they
/// care about. Calls happen on the task driving the session, one at a time.
pub trait SessionObserver: Send + Sync {
    /// Called after every state change, including reset to idle.
    ///
    /// `progress` is a 0–100 indicator that never decreases within a session.
    fn on_transition(&self, status: SessionStatus, progress: u8) {
        let _ = (status, progress);
    }

    /// Called once when a session enters the error state.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// Observer used when none is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ObserverHandle = Arc<dyn SessionObserver>;
