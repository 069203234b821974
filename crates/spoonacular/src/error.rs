use std::time::Duration;

use axum::{
    Json,
    body::Body,
    response::{IntoResponse, Response},
};
use http::{StatusCode, header};
use serde::Serialize;
use thiserror::Error;

/// Proxy errors with their HTTP renderings.
///
/// Locally produced failures are wrapped in the JSON error envelope, while
/// upstream HTTP failures pass through verbatim. The asymmetry is
/// deliberate: the upstream's own error format is already what clients
/// expect, so re-wrapping it would only lose information.
#[derive(Debug, Error)]
pub enum Error {
    /// A denylisted query parameter was set. These are disabled to conserve
    /// the metered upstream quota.
    #[error("{0} is disabled.")]
    ParamDisabled(String),

    /// The client exhausted the route's quota for the current window.
    #[error("Rate limit exceeded, retry in {}s.", retry_after.as_secs().max(1))]
    RateLimited {
        /// Time remaining in the client's current window.
        retry_after: Duration,
    },

    /// The upstream answered with a non-2xx status.
    #[error("Upstream returned {status}")]
    Upstream {
        /// Upstream HTTP status code, forwarded as-is.
        status: StatusCode,
        /// Upstream content-type, forwarded as-is.
        content_type: String,
        /// Upstream body, forwarded as-is.
        body: Vec<u8>,
    },

    /// The upstream call did not complete within the configured timeout.
    #[error("The upstream service did not respond in time.")]
    UpstreamTimeout {
        /// Transport-level failure detail, logged but not exposed.
        detail: String,
    },

    /// The upstream could not be reached at the transport level.
    #[error("The upstream service could not be reached.")]
    UpstreamUnreachable {
        /// Transport-level failure detail, logged but not exposed.
        detail: String,
    },

    /// The rate limiter storage backend failed.
    #[error("The rate limiter is unavailable.")]
    Limiter {
        /// Backend failure detail, logged but not exposed.
        detail: String,
    },
}

impl Error {
    /// The HTTP status this error renders as.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::ParamDisabled(_) => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { status, .. } => *status,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::Limiter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rate_limit::RateLimitError> for Error {
    fn from(error: rate_limit::RateLimitError) -> Self {
        match error {
            rate_limit::RateLimitError::RouteLimitExceeded { retry_after, .. } => {
                Self::RateLimited { retry_after }
            }
            rate_limit::RateLimitError::Storage(error) => Self::Limiter {
                detail: error.to_string(),
            },
        }
    }
}

/// The single wire shape for locally produced errors, mirroring the
/// upstream API's own failure format.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    status: &'static str,
    code: u16,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            Self::Upstream {
                status,
                content_type,
                body,
            } => {
                log::debug!("Forwarding upstream error response ({status})");

                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;

                if let Ok(value) = header::HeaderValue::from_str(&content_type) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }

                response
            }
            error => {
                match &error {
                    Self::UpstreamTimeout { detail } => {
                        log::error!("Upstream request timed out: {detail}");
                    }
                    Self::UpstreamUnreachable { detail } => {
                        log::error!("Upstream request failed: {detail}");
                    }
                    Self::Limiter { detail } => {
                        log::error!("Rate limiter failure: {detail}");
                    }
                    _ => log::debug!("Request rejected ({status}): {error}"),
                }

                let name = status.canonical_reason().unwrap_or("Unknown Error");
                let description = error.to_string();

                // Only display the name if there's no description.
                let message = if description.is_empty() {
                    name.to_string()
                } else {
                    format!("{name}: {description}")
                };

                let envelope = ErrorEnvelope {
                    status: "failure",
                    code: status.as_u16(),
                    message,
                };

                (status, Json(envelope)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::response::IntoResponse;
    use http::{StatusCode, header};

    use super::Error;

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn param_rejection_renders_envelope() {
        let response = Error::ParamDisabled("addRecipeNutrition".to_string()).into_response();

        assert_eq!(StatusCode::FORBIDDEN, response.status());
        assert_eq!(
            "application/json",
            response.headers()[header::CONTENT_TYPE].to_str().unwrap()
        );

        insta::assert_snapshot!(body_string(response).await, @r#"{"status":"failure","code":403,"message":"Forbidden: addRecipeNutrition is disabled."}"#);
    }

    #[tokio::test]
    async fn rate_limit_rejection_renders_envelope() {
        let error = Error::RateLimited {
            retry_after: Duration::from_secs(42),
        };

        let response = error.into_response();

        assert_eq!(StatusCode::TOO_MANY_REQUESTS, response.status());

        insta::assert_snapshot!(body_string(response).await, @r#"{"status":"failure","code":429,"message":"Too Many Requests: Rate limit exceeded, retry in 42s."}"#);
    }

    #[tokio::test]
    async fn timeout_renders_gateway_timeout() {
        let error = Error::UpstreamTimeout {
            detail: "deadline exceeded".to_string(),
        };

        let response = error.into_response();

        assert_eq!(StatusCode::GATEWAY_TIMEOUT, response.status());

        insta::assert_snapshot!(body_string(response).await, @r#"{"status":"failure","code":504,"message":"Gateway Timeout: The upstream service did not respond in time."}"#);
    }

    #[tokio::test]
    async fn upstream_error_passes_through_unwrapped() {
        let error = Error::Upstream {
            status: StatusCode::NOT_FOUND,
            content_type: "application/json".to_string(),
            body: br#"{"err":"x"}"#.to_vec(),
        };

        let response = error.into_response();

        assert_eq!(StatusCode::NOT_FOUND, response.status());
        assert_eq!(
            "application/json",
            response.headers()[header::CONTENT_TYPE].to_str().unwrap()
        );
        assert_eq!(r#"{"err":"x"}"#, body_string(response).await);
    }
}
