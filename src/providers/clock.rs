//! Clock trait.
//!
//! TOTP verification and token expiry both depend on "now". Injecting the
//! clock keeps those paths deterministic in tests.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as seconds since the Unix epoch.
    ///
    /// Saturates at zero for pre-epoch clocks rather than wrapping.
    fn unix_timestamp(&self) -> u64 {
        let secs = self.now().timestamp();
        u64::try_from(secs).unwrap_or(0)
    }
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_unix_timestamp_matches_now() {
        let clock = SystemClock;
        let ts = clock.unix_timestamp();
        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        assert!(now.abs_diff(ts) <= 1);
    }
}
