//! Service error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage file {path} could not be accessed: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    StorageFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {path} could not be read: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is invalid: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a share payload could not be decoded.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("share code is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("share code is not a valid payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("share URL is invalid: {0}")]
    Url(#[from] url::ParseError),
}
