//! Edge guard middleware.
//! Classifies every request before it reaches the origin.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::filters::Verdict;
use crate::guard::{ClientIdentity, EdgeGuard};
use crate::http::request::request_id;
use crate::observability::metrics;

/// Middleware state. `guard` is `None` in pass-through mode.
#[derive(Clone)]
pub struct GuardState {
    guard: Option<Arc<EdgeGuard>>,
    country_header: HeaderName,
}

impl GuardState {
    pub fn new(guard: Option<Arc<EdgeGuard>>, country_header: HeaderName) -> Self {
        Self {
            guard,
            country_header,
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.guard.is_some()
    }
}

pub async fn edge_guard_middleware(
    State(state): State<GuardState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // No store configured: forward everything.
    let Some(guard) = &state.guard else {
        metrics::record_bypass();
        return next.run(req).await;
    };

    let client = ClientIdentity::from_headers(req.headers(), &state.country_header);
    match guard.inspect(&client).await {
        Verdict::Pass => next.run(req).await,
        Verdict::Reject(rejection) => {
            tracing::debug!(
                request_id = %request_id(&req),
                client = %client.address(),
                stage = %rejection.stage,
                "Terminating request at the edge"
            );
            rejection.denial.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::notify::Notifier;
    use crate::store::MemoryStore;
    use crate::test_support::CountingLookup;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(guard: Option<Arc<EdgeGuard>>) -> Router {
        let state = GuardState::new(guard, HeaderName::from_static("x-vercel-ip-country"));
        Router::new()
            .route("/", get(|| async { "origin" }))
            .layer(middleware::from_fn_with_state(state, edge_guard_middleware))
    }

    fn guard() -> Arc<EdgeGuard> {
        let mut config = GuardConfig::default();
        config.filters.blocked_countries = vec!["KP".into()];
        Arc::new(EdgeGuard::from_parts(
            &config,
            Arc::new(MemoryStore::new()),
            CountingLookup::answering("AS3320"),
            Notifier::disabled(),
        ))
    }

    fn request(country: &str, agent: &str) -> Request<Body> {
        Request::builder()
            .uri("/")
            .header("x-forwarded-for", "80.1.2.3")
            .header("x-vercel-ip-country", country)
            .header("user-agent", agent)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_allowed_request_reaches_origin() {
        let response = app(Some(guard())).oneshot(request("DE", "Mozilla/5.0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_denied_country_never_reaches_origin() {
        let response = app(Some(guard())).oneshot(request("KP", "Mozilla/5.0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_pass_through_without_guard() {
        let app = app(None);
        let response = app.oneshot(request("KP", "curl/8.4.0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
