//! Real-time signals forcing block refreshes
//!
//! The signal handler itself only records the delivery (signal-hook's self
//! pipe); refreshing and printing happen on the bridge's worker thread.

use crate::bar::{Bar, Emitter};
use crate::block::Block;
use signal_hook::iterator::Signals;
use std::collections::HashMap;
use std::io;
use std::ops::RangeInclusive;
use std::os::raw::c_int;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// SIGRTMIN..=SIGRTMAX of the running platform
pub fn realtime_range() -> RangeInclusive<c_int> {
    libc::SIGRTMIN()..=libc::SIGRTMAX()
}

/// Signal number for an offset from SIGRTMIN, `None` when out of range
pub fn realtime_signal(offset: i64) -> Option<c_int> {
    let range = realtime_range();
    let signal = c_int::try_from(offset).ok()?.checked_add(*range.start())?;
    (offset >= 0 && range.contains(&signal)).then_some(signal)
}

/// Which blocks subscribed to which signal, fixed after construction
#[derive(Default)]
pub struct SignalRoutes {
    routes: HashMap<c_int, Vec<Arc<Block>>>,
}

impl SignalRoutes {
    pub fn new(bar: &Bar) -> Self {
        let mut routes: HashMap<c_int, Vec<Arc<Block>>> = HashMap::new();
        bar.visit(&mut |block| {
            for signal in &block.settings().signals {
                routes.entry(*signal).or_default().push(Arc::clone(block));
            }
        });
        Self { routes }
    }

    pub fn blocks(&self, signal: c_int) -> &[Arc<Block>] {
        self.routes.get(&signal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Routed signal numbers, ascending
    pub fn signals(&self) -> Vec<c_int> {
        let mut signals: Vec<c_int> = self.routes.keys().copied().collect();
        signals.sort_unstable();
        signals
    }
}

pub struct SignalBridge {
    routes: SignalRoutes,
    emitter: Emitter,
}

impl SignalBridge {
    pub fn new(routes: SignalRoutes, emitter: Emitter) -> Self {
        Self { routes, emitter }
    }

    /// Refresh the blocks routed to `signal` and write a frame
    ///
    /// Returns false for a signal no block subscribed to.
    pub fn deliver(&self, signal: c_int) -> io::Result<bool> {
        let blocks = self.routes.blocks(signal);
        if blocks.is_empty() {
            log::debug!("Signal {} is not bound to any block", signal);
            return Ok(false);
        }

        let now = Instant::now();
        for block in blocks {
            block.request_update(now, false);
        }
        for block in blocks {
            block.request_update(now, true);
        }
        self.emitter.emit()?;
        Ok(true)
    }

    /// Catch the whole real-time range and serve deliveries on a worker
    ///
    /// Unbound real-time signals are absorbed instead of killing the process.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        let mut signals = Signals::new(realtime_range())?;
        log::info!(
            "Listening for signals {:?}, bound: {:?}",
            realtime_range(),
            self.routes.signals()
        );

        thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    log::debug!("Received signal {}", signal);
                    if let Err(e) = self.deliver(signal) {
                        log::warn!("Writing frame after signal {} failed: {}", signal, e);
                        break;
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_signal() {
        let range = realtime_range();
        assert!(range.start() < range.end());

        assert_eq!(realtime_signal(0), Some(*range.start()));
        assert_eq!(realtime_signal(3), Some(range.start() + 3));
        let last = (range.end() - range.start()) as i64;
        assert_eq!(realtime_signal(last), Some(*range.end()));
        assert_eq!(realtime_signal(last + 1), None);
        assert_eq!(realtime_signal(-1), None);
        assert_eq!(realtime_signal(i64::MAX), None);
    }
}
