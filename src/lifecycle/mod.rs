//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → store → notifier → ASN lookup → EdgeGuard
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Shutdown::trigger → server drains, workers exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: a configured store that cannot be reached is fatal
//! - A missing store URL is not an error; the guard runs in pass-through mode
//! - Background tasks hold a ShutdownSignal rather than being aborted

pub mod shutdown;
pub mod startup;

pub use shutdown::{trigger_on_ctrl_c, Shutdown, ShutdownSignal};
pub use startup::{build_guard, StartupError};
