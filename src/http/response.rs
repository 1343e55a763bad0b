//! The rejection response written for denied requests.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A 429 response carrying a whole-second retry hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    retry_after_secs: u64,
}

impl RateLimitExceeded {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            retry_after_secs: retry_after_secs(retry_after),
        }
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: format!("rate limit exceeded, retry after: {}", self.retry_after_secs),
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        response
    }
}

/// Round a retry duration up to whole seconds.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
