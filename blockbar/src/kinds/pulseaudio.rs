use super::audio::{AudioMonitor, Device};
use crate::block::{MouseAction, Reading, RefreshContext, Source};
use crate::config::{expect_bool, expect_number, expect_str};
use crate::error::ConfigError;
use anyhow::Context;
use std::sync::Arc;

/// Volume and mute state of the default sink or source
pub struct PulseAudio {
    device: Device,
    monitor: Arc<AudioMonitor>,
    format_muted: Option<String>,
    color_muted: Option<String>,
    click_to_mute: bool,
    enable_scroll: bool,
    volume_step: f64,
    max_volume: f64,
    global_volume_cap: bool,
}

impl PulseAudio {
    pub fn new(device: Device, monitor: Arc<AudioMonitor>) -> Self {
        Self {
            device,
            monitor,
            format_muted: None,
            color_muted: None,
            click_to_mute: false,
            enable_scroll: false,
            volume_step: 5.0,
            max_volume: 100.0,
            global_volume_cap: false,
        }
    }

    fn configure_output(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        match key {
            "enable-scroll" => self.enable_scroll = expect_bool(value, location)?,
            "volume-step" => self.volume_step = expect_percentage(value, location)?,
            "max-volume" => self.max_volume = expect_percentage(value, location)?,
            "global-volume-cap" => self.global_volume_cap = expect_bool(value, location)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn expect_percentage(value: &toml::Value, location: &str) -> Result<f64, ConfigError> {
    let percentage = expect_number(value, location)?;
    if percentage < 0.0 {
        return Err(ConfigError::invalid(location, "must not be negative"));
    }
    Ok(percentage)
}

/// Volume after one scroll step, `None` when it would not change
fn scroll_target(current: f64, step: f64, max: f64, action: MouseAction) -> Option<f64> {
    let target = match action {
        MouseAction::ScrollUp => (current + step).min(max),
        MouseAction::ScrollDown => (current - step).max(0.0),
        _ => return None,
    };
    if (target - current).abs() < 0.5 {
        return None;
    }
    Some(target)
}

impl Source for PulseAudio {
    fn configure(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        match key {
            "format-muted" => self.format_muted = Some(expect_str(value, location)?.to_string()),
            "color-muted" => self.color_muted = Some(expect_str(value, location)?.to_string()),
            "click-to-mute" => self.click_to_mute = expect_bool(value, location)?,
            _ if self.device == Device::Sink => return self.configure_output(key, value, location),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let state = self
            .monitor
            .device(self.device)
            .context("audio state not known yet")?;

        let mut volume = state.volume;
        if self.global_volume_cap && volume > self.max_volume {
            if self.monitor.set_volume(self.device, self.max_volume) {
                volume = self.max_volume;
            }
        }

        let mut reading = Reading::new().value(volume);
        if state.muted {
            if let Some(format) = &self.format_muted {
                reading = reading.with_format(format.clone());
            }
        }
        match (&self.color_muted, state.muted) {
            (Some(color), true) => reading = reading.style("color", color.clone()),
            _ => reading = reading.clear_style("color"),
        }
        Ok(reading)
    }

    fn handle_click(&mut self, action: MouseAction) -> bool {
        if !self.click_to_mute || action != MouseAction::Primary {
            return false;
        }
        let Some(state) = self.monitor.device(self.device) else {
            return false;
        };
        self.monitor.set_mute(self.device, !state.muted)
    }

    fn handle_scroll(&mut self, action: MouseAction) -> bool {
        if !self.enable_scroll {
            return false;
        }
        let Some(state) = self.monitor.device(self.device) else {
            return false;
        };
        match scroll_target(state.volume, self.volume_step, self.max_volume, action) {
            Some(target) => self.monitor.set_volume(self.device, target),
            None => false,
        }
    }

    /// The slider spans 0 to 100 percent, capped at `max-volume`
    fn handle_slider_click(&mut self, fraction: f64) -> bool {
        let target = (fraction.clamp(0.0, 1.0) * 100.0).min(self.max_volume);
        self.monitor.set_volume(self.device, target)
    }
}
