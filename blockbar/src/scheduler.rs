//! Main loop: one cycle per wall-clock second

use crate::bar::Emitter;
use crate::block::Timestamp;
use chrono::{DateTime, SubsecRound, Utc};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

pub struct Scheduler {
    emitter: Emitter,
}

impl Scheduler {
    pub fn new(emitter: Emitter) -> Self {
        Self { emitter }
    }

    /// Tick every block, wait for the needed ones, then write a frame
    pub fn cycle(&self, timestamp: Timestamp) -> io::Result<()> {
        let bar = self.emitter.bar();
        bar.tick(timestamp);
        bar.wait_needed(timestamp);
        self.emitter.emit()
    }

    /// Run cycles until the output fails
    ///
    /// Sleeps are aligned to wall-clock seconds, freshness points are taken
    /// from the monotonic clock.
    pub fn run(&self) -> io::Result<()> {
        loop {
            self.cycle(Instant::now())?;

            let now = Utc::now();
            thread::sleep(until(next_boundary(now), now));
        }
    }
}

/// The first whole second strictly after `now`
pub fn next_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0) + chrono::Duration::seconds(1)
}

fn until(next: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
