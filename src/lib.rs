//! Edge request guard library.

// Core pipeline
pub mod detection;
pub mod filters;
pub mod guard;
pub mod limiter;

// Backing services
pub mod asn;
pub mod notify;
pub mod store;

// Surfaces and cross-cutting concerns
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

#[cfg(test)]
mod test_support;

pub use config::GuardConfig;
pub use filters::Verdict;
pub use guard::{ClientIdentity, EdgeGuard};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
