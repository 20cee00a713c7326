//! Denial responses.
//!
//! Bodies are fixed short strings; the reason is logged, never returned.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

use crate::filters::Denial;

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let body = match self.status {
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::TOO_MANY_REQUESTS => "Too Many Requests",
            other => other.canonical_reason().unwrap_or("Request Rejected"),
        };
        let mut response = (self.status, body).into_response();

        if self.status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(retry_after) = self.retry_after {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
            }
        }
        response
    }
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
