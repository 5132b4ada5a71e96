//! Time sources for window expiry and clip naming.
//!
//! Expiry is computed on the monotonic clock. Clip names use local wall time,
//! matching how operators browse recordings on disk.

use chrono::{DateTime, Local, TimeDelta};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub trait Clock: Send {
    /// Monotonic instant used for recording window arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock time used to name new clips.
    fn wall_now(&self) -> DateTime<Local>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock. Clones share the same timeline.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base_instant: Instant,
    base_wall: DateTime<Local>,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base_instant: Instant::now(),
            base_wall: Local::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner()) = elapsed;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn wall_now(&self) -> DateTime<Local> {
        TimeDelta::from_std(self.elapsed())
            .ok()
            .and_then(|delta| self.base_wall.checked_add_signed(delta))
            .unwrap_or(self.base_wall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_elapsed_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_secs(3));

        assert_eq!(clock.now() - start, Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn wall_time_tracks_elapsed() {
        let clock = ManualClock::new();
        let wall_start = clock.wall_now();

        clock.set_elapsed(Duration::from_secs(90));

        assert_eq!((clock.wall_now() - wall_start).num_seconds(), 90);
    }
}
