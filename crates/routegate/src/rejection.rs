//! Rejection responses for gated routes
//!
//! Authentication failures answer `401 Unauthorized`, scope failures answer
//! `403 Forbidden`. Both carry an RFC 6750 `WWW-Authenticate` challenge and a JSON
//! body whose `error` field is the machine-readable code:
//!
//! ```text
//! HTTP/1.1 403 Forbidden
//! WWW-Authenticate: Bearer error="insufficient_scope", scope="write:items"
//! Content-Type: application/json
//!
//! {"error":"insufficient_scope","error_description":"missing required scope: write:items"}
//! ```

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use routegate_auth::{MalformedToken, VerificationError};
use serde_json::json;
use tracing::warn;

/// Why a gated request was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The bearer token is absent or failed verification
    #[error(transparent)]
    Unauthenticated(#[from] VerificationError),
    /// The token is valid but lacks required scopes
    #[error("missing required scope: {}", .missing.join(" "))]
    InsufficientScope {
        /// Required scopes that were not granted
        missing: Vec<String>,
    },
}

impl From<MalformedToken> for Rejection {
    fn from(error: MalformedToken) -> Self {
        Self::Unauthenticated(error.into())
    }
}

impl Rejection {
    /// HTTP status for this rejection
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientScope { .. } => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(e) => e.code(),
            Self::InsufficientScope { .. } => "insufficient_scope",
        }
    }

    /// Description safe to show to the client
    ///
    /// Key resolution failures are reported generically so the response carries no
    /// information about the authority's availability.
    pub fn description(&self) -> String {
        match self {
            Self::Unauthenticated(e) if e.is_key_resolution() => {
                "token could not be verified".to_string()
            }
            other => other.to_string(),
        }
    }

    /// `WWW-Authenticate` challenge value
    pub fn challenge(&self) -> String {
        match self {
            // No credentials: bare challenge (RFC 6750 §3.1)
            Self::Unauthenticated(VerificationError::Malformed(MalformedToken::Missing)) => {
                "Bearer".to_string()
            }
            Self::Unauthenticated(VerificationError::Malformed(_)) => format!(
                "Bearer error=\"invalid_request\", error_description=\"{}\"",
                escape_param_value(&self.description())
            ),
            Self::Unauthenticated(_) => format!(
                "Bearer error=\"invalid_token\", error_description=\"{}\"",
                escape_param_value(&self.description())
            ),
            Self::InsufficientScope { missing } => format!(
                "Bearer error=\"insufficient_scope\", scope=\"{}\"",
                escape_param_value(&missing.join(" "))
            ),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        warn!(
            code,
            status = status.as_u16(),
            reason = %self,
            "Request rejected"
        );

        let body = Json(json!({
            "error": code,
            "error_description": self.description(),
        }));

        let mut response = (status, body).into_response();
        if let Ok(challenge) = HeaderValue::from_str(&self.challenge()) {
            response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

fn escape_param_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
