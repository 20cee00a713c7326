//! Alert message formatting.

use std::fmt;

/// Snapshot of an attack window, rendered as an operator alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackReport {
    pub total: i64,
    pub blocked: i64,
    pub window_secs: u64,
}

impl AttackReport {
    /// Requests that got through. The two counters are read at slightly
    /// different instants, so this can be off by in-flight requests and may
    /// even be negative.
    pub fn passed(&self) -> i64 {
        self.total - self.blocked
    }

    /// Average requests per second over the detection window.
    pub fn strength(&self) -> f64 {
        if self.window_secs == 0 {
            return 0.0;
        }
        self.total as f64 / self.window_secs as f64
    }
}

impl fmt::Display for AttackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🚨 Possible attack detected")?;
        writeln!(f, "Requests in the last {}s: {}", self.window_secs, self.total)?;
        writeln!(f, "Blocked: {}", self.blocked)?;
        writeln!(f, "Passed: {}", self.passed())?;
        write!(f, "Strength: {:.2} req/s", self.strength())
    }
}
