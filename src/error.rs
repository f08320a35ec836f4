//! Error taxonomy for the editor core.
//!
//! Every variant is non-fatal: the editor stays interactive and the user may
//! retry the action that failed. [`EditorError::status_text`] renders the
//! message handed to the host's status sink.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Errors surfaced by editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// A required identifier (document, company, form) is missing; the
    /// operation was aborted before any network call.
    #[error("context incomplete: {0}")]
    ContextIncomplete(&'static str),
    /// Non-success HTTP response or network failure. No retry is attempted.
    #[error("remote failure{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RemoteFailure { status: Option<u16>, message: String },
    /// Persisted client-side JSON failed to parse.
    #[error("malformed local state in `{scope}`: {reason}")]
    MalformedLocalState { scope: String, reason: String },
    /// An expected mount point (overlay element, canvas) is absent.
    #[error("render target missing: {0}")]
    RenderTargetMissing(String),
    #[error("preset not found: {0}")]
    PresetNotFound(String),
    #[error("preset name is empty")]
    EmptyPresetName,
    #[error("no custom.* layers to save")]
    NoCustomLayers,
    #[error("no layer selected")]
    NothingSelected,
}

impl EditorError {
    /// User-visible status line for this failure.
    #[must_use]
    pub fn status_text(&self) -> String {
        format!("❌ {self}")
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::RemoteFailure { status: None, message: format!("invalid JSON payload: {err}") }
    }
}
