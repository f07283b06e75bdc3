use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failures of a single weather request. None of them is cached or retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("rate limit exceeded, try again later")]
    RateLimitExceeded,

    #[error("invalid coordinate: `{field}` is not a finite number")]
    InvalidCoordinate { field: &'static str },

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("failed to read upstream response: {0}")]
    UpstreamBodyReadFailure(String),

    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: u16 },

    #[error("upstream did not respond in time")]
    DeadlineExceeded,
}

impl ProxyError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidCoordinate { .. } => "invalid_coordinate",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::UpstreamBodyReadFailure(_) => "upstream_body_read_failure",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable(_)
            | Self::UpstreamBodyReadFailure(_)
            | Self::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Classify a reqwest failure. The URL carries the credential, so it is
    /// stripped before the message is kept.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::DeadlineExceeded;
        }
        Self::UpstreamUnreachable(err.without_url().to_string())
    }

    pub fn from_body_read(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::DeadlineExceeded;
        }
        Self::UpstreamBodyReadFailure(err.without_url().to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let field = match &self {
            Self::InvalidCoordinate { field } => Some(*field),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
                field,
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}
