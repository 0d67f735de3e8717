//! Time source for the ledger.
//!
//! Operations never call `Utc::now()` themselves; they ask an injected
//! [`Clock`], so expiry checks and audit timestamps are deterministic in tests.

use chrono::{DateTime, Utc};

/// Abstracts "now" for testability.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
