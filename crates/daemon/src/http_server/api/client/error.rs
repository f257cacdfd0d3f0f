use reqwest::{Response, StatusCode};
use serde::Deserialize;

/// Body returned by every API endpoint on failure
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("{kind} ({status}): {message}")]
    Remote {
        status: StatusCode,
        kind: String,
        message: String,
    },
}

impl ApiError {
    /// Build from a non-success response. Bodies that are not the JSON error
    /// shape keep their raw text as the message.
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return e.into(),
        };
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ApiError::Remote {
                status,
                kind: body.error,
                message: body.message,
            },
            Err(_) => ApiError::Remote {
                status,
                kind: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: text,
            },
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            ApiError::Reqwest(e) => e.status(),
            ApiError::UrlParse(_) => None,
        }
    }

    /// Error kind reported by the remote node, e.g. `PayloadNotFound`
    pub fn kind(&self) -> Option<&str> {
        match self {
            ApiError::Remote { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
