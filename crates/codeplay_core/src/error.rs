use thiserror::Error;

/// Errors raised by the core model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown language '{name}' (expected html, css or js)")]
    UnknownLanguage { name: String },
}

/// A preview surface refused or failed to load a document.
///
/// This is a render-level failure, distinct from errors thrown by the user's
/// own script (those are caught inside the document and reported as console
/// entries).
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface rejected the document: {0}")]
    Rejected(String),

    #[error("sandbox failure: {0}")]
    Sandbox(String),
}
