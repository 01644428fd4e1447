//! Share links
//!
//! The whole project travels in the `code` query parameter as base64 of a
//! JSON payload. Links are written with the URL-safe alphabet and no padding;
//! reading also accepts the standard alphabet, padded or not, and the `+`
//! that form decoding turns into a space.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use codeplay_core::SourceTriple;

use crate::error::ShareError;

/// Query parameter carrying the payload.
pub const SHARE_PARAM: &str = "code";

/// Payload version written by this editor.
pub const SHARE_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl SharePayload {
    pub fn from_sources(sources: &SourceTriple) -> Self {
        Self {
            html: Some(sources.html.clone()),
            css: Some(sources.css.clone()),
            js: Some(sources.js.clone()),
            version: Some(SHARE_VERSION.to_string()),
        }
    }

    /// The triple this payload describes; absent parts take their defaults.
    pub fn into_sources(self) -> SourceTriple {
        SourceTriple::from_parts(self.html, self.css, self.js)
    }
}

pub fn encode_payload(payload: &SharePayload) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

pub fn decode_payload(code: &str) -> Result<SharePayload, ShareError> {
    let cleaned: String = code
        .trim()
        .chars()
        .filter(|c| *c != '=')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();

    let bytes = match URL_SAFE_NO_PAD.decode(&cleaned) {
        Ok(bytes) => bytes,
        Err(_) => STANDARD_NO_PAD.decode(&cleaned)?,
    };
    let json = String::from_utf8(bytes)?;
    serde_json::from_str(&json).map_err(ShareError::Payload)
}

/// `page_url` without query or fragment, with `code` set to the encoded
/// project.
pub fn build_share_url(page_url: &Url, sources: &SourceTriple) -> Result<Url, ShareError> {
    let code = encode_payload(&SharePayload::from_sources(sources)).map_err(ShareError::Payload)?;

    let mut url = page_url.clone();
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair(SHARE_PARAM, &code);
    debug!(bytes = code.len(), "share link built");
    Ok(url)
}

/// What the page URL says about the project to open.
#[derive(Debug)]
pub enum ShareLoad {
    /// No `code` parameter, or an empty one.
    Absent,
    Loaded(SourceTriple),
    Invalid(ShareError),
}

pub fn load_from_url(url: &Url) -> ShareLoad {
    let code = url
        .query_pairs()
        .find(|(key, _)| key == SHARE_PARAM)
        .map(|(_, value)| value.into_owned());

    match code {
        None => ShareLoad::Absent,
        Some(code) if code.trim().is_empty() => ShareLoad::Absent,
        Some(code) => match decode_payload(&code) {
            Ok(payload) => {
                debug!(version = ?payload.version, "share payload decoded");
                ShareLoad::Loaded(payload.into_sources())
            }
            Err(err) => {
                warn!(%err, "invalid shared code");
                ShareLoad::Invalid(err)
            }
        },
    }
}
