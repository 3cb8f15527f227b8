use chrono::{DateTime, Utc};

/// Time source for the ingestion pipeline. The freshness gate and the batch
/// `fetched_at` stamp both come from here so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
