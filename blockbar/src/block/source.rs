//! Data source contract implemented by every block kind

use super::settings::Settings;
use crate::error::ConfigError;
use crate::template::Domain;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Mouse actions the bar reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Primary,
    Middle,
    Secondary,
    ScrollUp,
    ScrollDown,
}

impl MouseAction {
    /// Map an i3bar button code
    pub fn from_button(button: u32) -> Option<Self> {
        match button {
            1 => Some(MouseAction::Primary),
            2 => Some(MouseAction::Middle),
            3 => Some(MouseAction::Secondary),
            4 => Some(MouseAction::ScrollUp),
            5 => Some(MouseAction::ScrollDown),
            _ => None,
        }
    }

    pub fn is_scroll(&self) -> bool {
        matches!(self, MouseAction::ScrollUp | MouseAction::ScrollDown)
    }
}

/// Inputs handed to a source on every refresh
pub struct RefreshContext<'a> {
    /// Wall clock at the start of the refresh
    pub now: DateTime<Utc>,
    pub format: &'a str,
    pub domain: &'a Domain,
}

/// Result of a successful refresh
///
/// The engine renders `format` (or the configured format) with `fields`,
/// then the value tokens, and merges `style` into the block's overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    pub format: Option<String>,
    pub fields: Vec<(&'static str, String)>,
    pub value: Option<f64>,
    pub style: Vec<(String, Option<Value>)>,
}

impl Reading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `format` instead of the configured format for this cycle
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Override a protocol style key
    pub fn style(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.style.push((key.to_string(), Some(value.into())));
        self
    }

    /// Drop a previous override so the configured style shows again
    pub fn clear_style(mut self, key: &str) -> Self {
        self.style.push((key.to_string(), None));
        self
    }
}

/// Per-kind behaviour behind a block
///
/// `refresh` runs on the block's own update loop and may block on I/O; the
/// block's state lock is never held while it runs. Returning an error keeps
/// the previous text on screen.
pub trait Source: Send {
    /// Offer a kind-specific configuration key
    ///
    /// Returns `Ok(false)` when the key is not one this kind understands.
    fn configure(
        &mut self,
        _key: &str,
        _value: &toml::Value,
        _location: &str,
    ) -> Result<bool, ConfigError> {
        Ok(false)
    }

    /// Reject structurally invalid configuration once all keys are applied
    fn validate(&self, _settings: &Settings, _location: &str) -> Result<(), ConfigError> {
        Ok(())
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) -> anyhow::Result<Reading>;

    fn handle_click(&mut self, _action: MouseAction) -> bool {
        false
    }

    fn handle_scroll(&mut self, _action: MouseAction) -> bool {
        false
    }

    /// Click on the slider, `fraction` is the horizontal position in `0..=1`
    fn handle_slider_click(&mut self, _fraction: f64) -> bool {
        false
    }
}
