use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors the proxy surfaces to its HTTP callers.
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("{0}")]
    BadRequest(&'static str),

    /// The cause is logged where it happens; callers only see the generic message.
    #[error("{0}")]
    Upstream(&'static str),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Structurally unexpected recommendation payloads. Never shown to the user as
/// a hard failure; the search flow swaps in demo data instead.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("recommendation envelope reported failure")]
    Unsuccessful,

    #[error("recommendation envelope has no data")]
    MissingData,

    #[error("invalid recommendation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DetailError {
    /// Fatal: the route itself is unusable, only "back to search" helps.
    #[error("invalid route parameters: {0}")]
    InvalidRoute(String),

    /// Recoverable: retry by navigating again.
    #[error("failed to load details: {0:#}")]
    Load(#[from] anyhow::Error),
}

impl DetailError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DetailError::InvalidRoute(_))
    }
}
