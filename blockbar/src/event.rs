//! Click events read from the bar
//!
//! The bar writes an endless JSON array on our stdin: an opening `[` line,
//! then one event object per line, every one after the first prefixed with
//! a comma. Lines that do not parse are skipped.

use crate::bar::Emitter;
use crate::block::{MouseAction, SLIDER_SUFFIX};
use serde::Deserialize;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClickEvent {
    pub name: String,
    pub instance: String,
    pub button: u32,
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub relative_x: i64,
    #[serde(default)]
    pub relative_y: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

impl ClickEvent {
    /// Parse one line of the event stream, `None` for anything malformed
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let line = line.strip_prefix(',').unwrap_or(line).trim_start();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    pub fn action(&self) -> Option<MouseAction> {
        MouseAction::from_button(self.button)
    }

    /// Horizontal click position across the clicked entry, in `0..=1`
    pub fn fraction(&self) -> f64 {
        if self.width <= 0 {
            return 0.0;
        }
        (self.relative_x as f64 / self.width as f64).clamp(0.0, 1.0)
    }
}

pub struct EventRouter {
    emitter: Emitter,
}

impl EventRouter {
    pub fn new(emitter: Emitter) -> Self {
        Self { emitter }
    }

    /// Read events until `input` ends
    pub fn run(&self, input: impl BufRead) -> io::Result<()> {
        let mut lines = input.split(b'\n');

        // opening bracket of the event array
        if lines.next().transpose()?.is_none() {
            return Ok(());
        }

        for line in lines {
            let line = line?;
            self.handle_line(&String::from_utf8_lossy(&line))?;
        }
        Ok(())
    }

    /// Handle one event line; a frame is written when it reached a block
    pub fn handle_line(&self, line: &str) -> io::Result<bool> {
        let Some(event) = ClickEvent::parse(line) else {
            if !line.trim().is_empty() {
                log::debug!("Skipping malformed event: {}", line.trim());
            }
            return Ok(false);
        };
        if !self.dispatch(&event) {
            return Ok(false);
        }
        self.emitter.emit()?;
        Ok(true)
    }

    /// Route an event to its block and wait for the block to refresh
    ///
    /// Returns false when the event addressed nothing known.
    pub fn dispatch(&self, event: &ClickEvent) -> bool {
        let Some(action) = event.action() else {
            log::debug!("Ignoring button {}", event.button);
            return false;
        };

        let (instance, slider) = match event.instance.strip_suffix(SLIDER_SUFFIX) {
            Some(instance) => (instance, true),
            None => (event.instance.as_str(), false),
        };

        let bar = self.emitter.bar();
        let Some((top, sub)) = bar.resolve(instance) else {
            log::debug!("No block named {}", event.instance);
            return false;
        };
        let Some(target) = top.descendant(sub) else {
            log::debug!("No block named {}", event.instance);
            return false;
        };
        if target.kind() != event.name {
            log::debug!(
                "Event for {} names type {}, block is {}",
                event.instance,
                event.name,
                target.kind()
            );
            return false;
        }

        let handled = match (slider, action.is_scroll()) {
            (_, true) => top.handle_scroll(action, sub),
            (true, false) => top.handle_slider_click(action, sub, event.fraction()),
            (false, false) => top.handle_click(action, sub),
        };
        log::debug!(
            "{:?} on {} handled: {}",
            action,
            event.instance,
            handled
        );

        target.request_update(Instant::now(), true);
        true
    }

    pub fn spawn(self, input: impl BufRead + Send + 'static) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("events".to_string())
            .spawn(move || match self.run(input) {
                Ok(()) => log::info!("Event input closed"),
                Err(e) => log::warn!("Reading events failed: {}", e),
            })
    }
}
