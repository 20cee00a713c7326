//! Attack detection subsystem.
//!
//! # Data Flow
//! ```text
//! every request (before any filter)
//!     → record_and_check: INCR total (EXPIRE NX window) + GET blocked
//!     → check_for_attack: total > threshold?
//!         → SET notified NX EX cooldown → claimed? → AttackReport → notifier
//! every rejection (after the decision)
//!     → record_blocked: INCR blocked (EXPIRE NX window)
//! ```
//!
//! # Design Decisions
//! - Fail open: counter failures read as (0, 0) and never block traffic
//! - `total` and `blocked` are not read atomically together; the passed
//!   figure in alerts is an approximation
//! - The cooldown is independent of the counting window

pub mod attack;

pub use attack::{AttackDetector, CounterSnapshot, DetectionPolicy};
