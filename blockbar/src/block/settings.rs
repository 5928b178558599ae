//! Immutable per-block configuration

use crate::template::Domain;
use serde_json::Value;
use std::collections::BTreeMap;

/// Scheduled refresh cadence in scheduler ticks
///
/// `Interval::NEVER` (0) disables scheduled refreshes; the block then only
/// updates on demand, on click or on signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(u64);

impl Interval {
    pub const NEVER: Interval = Interval(0);
    pub const EVERY_TICK: Interval = Interval(1);

    pub fn ticks(ticks: u64) -> Self {
        Interval(ticks)
    }

    /// Whether tick number `count` (1-based) is due for a refresh
    pub fn is_due(&self, count: u64) -> bool {
        match self.0 {
            0 => false,
            1 => true,
            n => count % n == 0,
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::EVERY_TICK
    }
}

/// What a click does to the slider's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliderToggle {
    #[default]
    Keep,
    On,
    Off,
    Toggle,
}

impl SliderToggle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "on" => Some(SliderToggle::On),
            "off" => Some(SliderToggle::Off),
            "toggle" => Some(SliderToggle::Toggle),
            _ => None,
        }
    }

    pub fn apply(&self, shown: bool) -> bool {
        match self {
            SliderToggle::Keep => shown,
            SliderToggle::On => true,
            SliderToggle::Off => false,
            SliderToggle::Toggle => !shown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickSettings {
    pub command: Option<String>,
    pub blocking: bool,
    pub single_instance: bool,
    pub slider: SliderToggle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderSettings {
    pub width: usize,
    pub fill: String,
    pub empty: String,
    pub command: Option<String>,
}

impl Default for SliderSettings {
    fn default() -> Self {
        Self {
            width: 10,
            fill: "━".to_string(),
            empty: "─".to_string(),
            command: None,
        }
    }
}

/// Settings only composite blocks carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeSettings {
    pub show_default: bool,
    /// Collapse after this many ticks without a click, 0 disables
    pub collapse_after: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub format: String,
    pub interval: Interval,
    pub domain: Domain,
    pub needed: bool,
    /// Absolute signal numbers
    pub signals: Vec<i32>,
    /// Protocol keys emitted with every entry of this block
    pub style: BTreeMap<String, Value>,
    pub click: ClickSettings,
    pub slider: SliderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: String::new(),
            interval: Interval::default(),
            domain: Domain::default(),
            needed: false,
            signals: Vec::new(),
            style: BTreeMap::new(),
            click: ClickSettings::default(),
            slider: SliderSettings::default(),
        }
    }
}

impl Settings {
    /// Settings with just a format, everything else defaulted
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_due() {
        let every_five = Interval::ticks(5);
        let due: Vec<u64> = (1..=12).filter(|n| every_five.is_due(*n)).collect();
        assert_eq!(due, vec![5, 10]);

        assert!((1..=5).all(|n| Interval::EVERY_TICK.is_due(n)));
        assert!((1..=100).all(|n| !Interval::NEVER.is_due(n)));
    }

    #[test]
    fn test_slider_toggle() {
        assert!(SliderToggle::On.apply(false));
        assert!(!SliderToggle::Off.apply(true));
        assert!(SliderToggle::Toggle.apply(false));
        assert!(!SliderToggle::Toggle.apply(true));
        assert!(SliderToggle::Keep.apply(true));
        assert_eq!(SliderToggle::from_str("toggle"), Some(SliderToggle::Toggle));
        assert_eq!(SliderToggle::from_str("sometimes"), None);
    }
}
