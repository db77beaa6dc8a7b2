//! Time source for signing timestamps.
//!
//! The registry stamps records with `Clock::now_epoch_seconds`. Tests inject a
//! `FixedClock` so timestamps are reproducible.

/// Source of Unix epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_epoch_seconds() > 1_577_836_800);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let c = FixedClock(42);
        assert_eq!(c.now_epoch_seconds(), 42);
        assert_eq!(c.now_epoch_seconds(), 42);
    }
}
