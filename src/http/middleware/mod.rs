//! Request middleware.

pub mod edge_guard;

pub use edge_guard::{edge_guard_middleware, GuardState};
