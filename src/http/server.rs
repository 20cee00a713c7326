//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router with the guard middleware and tower layers
//! - Forward admitted requests to the single configured origin
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderName, Request, StatusCode, Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GuardConfig;
use crate::guard::EdgeGuard;
use crate::http::middleware::{edge_guard_middleware, GuardState};
use crate::http::request::{request_id, RequestIdLayer};
use crate::lifecycle::ShutdownSignal;

/// Errors detected while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("origin url '{0}' must be an absolute http URL")]
    Origin(String),

    #[error("invalid country header name '{0}'")]
    CountryHeader(String),
}

/// Where admitted requests go.
#[derive(Debug, Clone)]
pub struct Origin {
    scheme: Scheme,
    authority: Authority,
}

impl Origin {
    pub fn parse(url: &str) -> Result<Self, ServerError> {
        let uri: Uri = url.parse().map_err(|_| ServerError::Origin(url.to_string()))?;
        match (uri.scheme(), uri.authority()) {
            (Some(scheme), Some(authority)) if *scheme == Scheme::HTTP => Ok(Self {
                scheme: scheme.clone(),
                authority: authority.clone(),
            }),
            _ => Err(ServerError::Origin(url.to_string())),
        }
    }

    /// Point `uri` at the origin, keeping path and query.
    fn rewrite(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path)
            .build()
    }
}

#[derive(Clone)]
struct ForwardState {
    origin: Arc<Origin>,
    client: Client<HttpConnector, Body>,
}

/// HTTP server guarding a single origin.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
}

impl HttpServer {
    /// Create a server. `guard` is `None` in pass-through mode.
    pub fn new(config: GuardConfig, guard: Option<Arc<EdgeGuard>>) -> Result<Self, ServerError> {
        let origin = Origin::parse(&config.origin.url)?;
        let country_header = HeaderName::from_bytes(config.filters.country_header.as_bytes())
            .map_err(|_| ServerError::CountryHeader(config.filters.country_header.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let forward = ForwardState {
            origin: Arc::new(origin),
            client,
        };
        let guard_state = GuardState::new(guard, country_header);

        tracing::info!(
            origin = %config.origin.url,
            mode = if guard_state.is_filtering() { "filtering" } else { "pass-through" },
            "HTTP server configured"
        );

        let router = Self::build_router(&config, forward, guard_state);
        Ok(Self { router, config })
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GuardConfig, forward: ForwardState, guard: GuardState) -> Router {
        Router::new()
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .with_state(forward)
            .layer(middleware::from_fn_with_state(guard, edge_guard_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(req),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(RequestIdLayer)
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Router with every layer attached, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Forward an admitted request to the origin.
async fn forward_handler(State(state): State<ForwardState>, request: Request<Body>) -> Response {
    let id = request_id(&request).to_string();
    let (mut parts, body) = request.into_parts();

    parts.uri = match state.origin.rewrite(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %id, error = %e, "Could not build origin URI");
            return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
        }
    };
    // The origin connection is HTTP/1.1 regardless of the client's version.
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %id, error = %e, "Origin request failed");
            (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
        }
    }
}
