//! Wall clock abstraction

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Unix time in milliseconds
    fn now_millis(&self) -> i64;

    /// Unix time in whole seconds
    fn now_secs(&self) -> u64 {
        (self.now_millis() / 1000).max(0) as u64
    }
}

/// System wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
