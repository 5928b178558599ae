//! Shared audio state, followed through `pactl`
//!
//! One background loop listens to `pactl subscribe` and re-queries the
//! default sink or source whenever the server reports a change. Blocks only
//! ever read the published snapshot; commands they issue become visible once
//! the loop has observed the resulting change event.

use anyhow::{bail, Context};
use parking_lot::{Condvar, Mutex};
use std::io::{self, BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long a set command waits to see its effect in the snapshot
const SETTLE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Sink,
    Source,
}

impl Device {
    fn noun(&self) -> &'static str {
        match self {
            Device::Sink => "sink",
            Device::Source => "source",
        }
    }

    fn default_name(&self) -> &'static str {
        match self {
            Device::Sink => "@DEFAULT_SINK@",
            Device::Source => "@DEFAULT_SOURCE@",
        }
    }
}

/// Volume in percent of nominal, averaged over channels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceState {
    pub volume: f64,
    pub muted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioSnapshot {
    pub sink: Option<DeviceState>,
    pub source: Option<DeviceState>,
}

impl AudioSnapshot {
    pub fn get(&self, device: Device) -> Option<DeviceState> {
        match device {
            Device::Sink => self.sink,
            Device::Source => self.source,
        }
    }

    fn set(&mut self, device: Device, state: Option<DeviceState>) {
        match device {
            Device::Sink => self.sink = state,
            Device::Source => self.source = state,
        }
    }
}

struct Published {
    snapshot: AudioSnapshot,
    generation: u64,
}

pub struct AudioMonitor {
    published: Mutex<Published>,
    changed: Condvar,
    started: AtomicBool,
}

impl Default for AudioMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMonitor {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Published {
                snapshot: AudioSnapshot::default(),
                generation: 0,
            }),
            changed: Condvar::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> AudioSnapshot {
        self.published.lock().snapshot
    }

    pub fn device(&self, device: Device) -> Option<DeviceState> {
        self.snapshot().get(device)
    }

    /// Replace the state of one device and wake anyone waiting for a change
    pub fn publish(&self, device: Device, state: Option<DeviceState>) {
        let mut published = self.published.lock();
        if published.snapshot.get(device) == state {
            return;
        }
        published.snapshot.set(device, state);
        published.generation += 1;
        drop(published);
        self.changed.notify_all();
    }

    /// Start the monitor loop, once
    pub fn start(self: &Arc<Self>) -> io::Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let monitor = Arc::clone(self);
        thread::Builder::new()
            .name("audio-monitor".to_string())
            .spawn(move || monitor.run())?;
        Ok(())
    }

    fn run(&self) {
        self.requery(BOTH);

        let mut child = match Command::new("pactl")
            .arg("subscribe")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Audio monitor unavailable, cannot run pactl: {}", e);
                return;
            }
        };

        let Some(stdout) = child.stdout.take() else {
            return;
        };
        for line in BufReader::new(stdout).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Reading pactl events failed: {}", e);
                    break;
                }
            };
            if let Some(devices) = parse_event(&line) {
                self.requery(devices);
            }
        }

        let _ = child.wait();
        log::warn!("pactl subscribe exited, audio blocks will no longer update");
    }

    fn requery(&self, devices: &[Device]) {
        for device in devices {
            match query(*device) {
                Ok(state) => self.publish(*device, Some(state)),
                Err(e) => log::debug!("Querying default {} failed: {:#}", device.noun(), e),
            }
        }
    }

    pub fn set_mute(&self, device: Device, muted: bool) -> bool {
        let command = format!("set-{}-mute", device.noun());
        let flag = if muted { "1" } else { "0" };
        self.command_and_wait(&[command.as_str(), device.default_name(), flag])
    }

    pub fn set_volume(&self, device: Device, percent: f64) -> bool {
        let command = format!("set-{}-volume", device.noun());
        let volume = format!("{}%", percent.max(0.0).round() as u64);
        self.command_and_wait(&[command.as_str(), device.default_name(), volume.as_str()])
    }

    /// Run a pactl command, then give the monitor a moment to publish its effect
    fn command_and_wait(&self, args: &[&str]) -> bool {
        let generation = self.published.lock().generation;

        match Command::new("pactl").args(args).stdin(Stdio::null()).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                log::debug!("pactl {} exited with {}", args.join(" "), status);
                return false;
            }
            Err(e) => {
                log::warn!("Failed to run pactl: {}", e);
                return false;
            }
        }

        self.wait_for_change(generation, SETTLE_TIMEOUT);
        true
    }

    /// Wait until the snapshot moves past `generation`, at most `timeout`
    fn wait_for_change(&self, generation: u64, timeout: Duration) -> bool {
        let mut published = self.published.lock();
        let result = self
            .changed
            .wait_while_for(&mut published, |p| p.generation == generation, timeout);
        !result.timed_out()
    }
}

const SINK: &[Device] = &[Device::Sink];
const SOURCE: &[Device] = &[Device::Source];
const BOTH: &[Device] = &[Device::Sink, Device::Source];

/// Devices to re-query for one line of `pactl subscribe` output
///
/// A server change may mean a new default device, so both are re-read.
pub fn parse_event(line: &str) -> Option<&'static [Device]> {
    let rest = line.trim().strip_prefix("Event '")?;
    let (_kind, rest) = rest.split_once("' on ")?;
    let facility = rest.split_whitespace().next()?;
    match facility {
        "sink" => Some(SINK),
        "source" => Some(SOURCE),
        "server" => Some(BOTH),
        _ => None,
    }
}

/// Average of the channel percentages in `pactl get-*-volume` output
pub fn parse_volume(text: &str) -> Option<f64> {
    let first = text.lines().next()?;
    let percentages: Vec<f64> = first
        .split('/')
        .filter_map(|part| part.trim().strip_suffix('%'))
        .filter_map(|number| number.trim().parse().ok())
        .collect();
    if percentages.is_empty() {
        return None;
    }
    Some(percentages.iter().sum::<f64>() / percentages.len() as f64)
}

/// Mute flag in `pactl get-*-mute` output
pub fn parse_mute(text: &str) -> Option<bool> {
    match text.trim().strip_prefix("Mute:")?.trim() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

fn pactl(args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("pactl")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .context("running pactl")?;
    if !output.status.success() {
        bail!("pactl {} exited with {}", args.join(" "), output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn query(device: Device) -> anyhow::Result<DeviceState> {
    let name = device.default_name();
    let volume = pactl(&[format!("get-{}-volume", device.noun()).as_str(), name])?;
    let mute = pactl(&[format!("get-{}-mute", device.noun()).as_str(), name])?;
    Ok(DeviceState {
        volume: parse_volume(&volume).context("unrecognised volume output")?,
        muted: parse_mute(&mute).context("unrecognised mute output")?,
    })
}
