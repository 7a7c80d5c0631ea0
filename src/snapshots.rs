//! Environment snapshot scheduling.
//!
//! The actual snapshot workers live with the environment pollers; this keeps
//! the interval they poll at, reconfigurable from a settings update after the
//! merge has been persisted.

use parking_lot::RwLock;
use std::time::Duration;
use tracing::info;

pub struct SnapshotScheduler {
    interval: RwLock<Duration>,
}

impl SnapshotScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: RwLock::new(interval),
        }
    }

    pub fn set_interval(&self, interval: Duration) {
        info!(?interval, "snapshot interval reconfigured");
        *self.interval.write() = interval;
    }

    pub fn interval(&self) -> Duration {
        *self.interval.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_reconfigurable() {
        let scheduler = SnapshotScheduler::new(Duration::from_secs(300));
        assert_eq!(scheduler.interval(), Duration::from_secs(300));
        scheduler.set_interval(Duration::from_secs(60));
        assert_eq!(scheduler.interval(), Duration::from_secs(60));
    }
}
