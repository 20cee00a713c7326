//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign x-request-id)
//!     → TraceLayer, TimeoutLayer
//!     → middleware/edge_guard.rs (classify; reject via response.rs)
//!     → server.rs forward_handler (single origin, hyper-util client)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{edge_guard_middleware, GuardState};
pub use request::{MakeRequestUuid, RequestIdLayer, X_REQUEST_ID};
pub use server::{HttpServer, Origin, ServerError};
