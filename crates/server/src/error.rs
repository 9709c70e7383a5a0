//! Structured errors for the early-hints middleware.
//!
//! Only [`HintsError::Body`] ever turns into a client-visible response; the
//! rest are logged and the page is served without hints.

use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum HintsError {
    /// The transport cannot emit informational responses.
    #[error("INFORMATIONAL_UNSUPPORTED: {0}")]
    InformationalUnsupported(String),

    /// Emitting an informational response failed.
    #[error("INFORMATIONAL_FAILED: {0}")]
    InformationalFailed(String),

    /// The inner response body failed while being buffered.
    #[error("BODY_FAILED: {0}")]
    Body(String),

    /// A generated header value is not a valid HTTP header value.
    #[error("INVALID_HEADER: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Core(#[from] early_hints_core::Error),
}

impl IntoResponse for HintsError {
    fn into_response(self) -> Response {
        let code = match &self {
            HintsError::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };

        (code, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_codes() {
        assert_eq!(HintsError::Body("reset".into()).to_string(), "BODY_FAILED: reset");
        assert_eq!(
            HintsError::InformationalUnsupported("http/1.0".into()).to_string(),
            "INFORMATIONAL_UNSUPPORTED: http/1.0"
        );
    }

    #[test]
    fn test_body_error_is_500() {
        let response = HintsError::Body("reset".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: HintsError = early_hints_core::Error::InvalidPattern("(".into()).into();
        assert_eq!(err.to_string(), "INVALID_PATTERN: (");
    }
}
