//! Configuration file loading
//!
//! The file is TOML. A global `order` array lists the top-level blocks in
//! display order; every name in it refers to a table of the same name:
//!
//! ```toml
//! order = ["volume", "clock"]
//!
//! [volume]
//! type = "internal/pulseaudio.output"
//! format = "%ramp% %value%%"
//! ramp = ["🔈", "🔉", "🔊"]
//!
//! [volume.click]
//! slider-show = "toggle"
//!
//! [clock]
//! type = "internal/datetime"
//! format = "%H:%M"
//! ```
//!
//! Configuration is parsed and validated completely before any block runs.

use crate::block::{
    ClickSettings, CompositeSettings, Identity, Interval, Settings, SliderSettings, SliderToggle,
    Source,
};
use crate::error::ConfigError;
use crate::kinds::{self, Services};
use crate::signals;
use crate::template::RAMP_TOKEN;
use serde_json::Value as Json;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use toml::{Table, Value};

/// Keys passed through verbatim into every protocol entry of a block
pub const STYLE_KEYS: &[&str] = &[
    "color",
    "background",
    "border",
    "border_top",
    "border_right",
    "border_bottom",
    "border_left",
    "min_width",
    "align",
    "urgent",
    "separator",
    "separator_block_width",
    "markup",
];

/// Most decimals a value is rendered with
pub const MAX_PRECISION: u64 = 16;

/// Widest slider, in cells
pub const MAX_SLIDER_WIDTH: u64 = 200;

#[derive(Debug)]
pub struct Config {
    pub blocks: Vec<BlockConfig>,
}

/// A fully configured block, ready to be turned into a running one
pub struct BlockConfig {
    pub identity: Identity,
    pub settings: Settings,
    pub source: Box<dyn Source>,
    pub composite: Option<CompositeSettings>,
    pub children: Vec<BlockConfig>,
}

impl fmt::Debug for BlockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockConfig")
            .field("identity", &self.identity)
            .field("settings", &self.settings)
            .field("composite", &self.composite)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn load(path: &Path, services: &mut Services) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, services)
    }

    pub fn parse(text: &str, services: &mut Services) -> Result<Self, ConfigError> {
        let table: Table = text.parse()?;

        let order = table.get("order").ok_or_else(|| ConfigError::MissingKey {
            location: "order".to_string(),
        })?;
        let order = expect_string_array(order, "order")?;

        let mut seen = HashSet::new();
        let mut blocks = Vec::with_capacity(order.len());
        for name in &order {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateInstance { name: name.clone() });
            }
            let block = match table.get(name) {
                Some(Value::Table(block)) => block,
                Some(_) => return Err(ConfigError::wrong_type(name, "a table")),
                None => return Err(ConfigError::UndefinedBlock { name: name.clone() }),
            };
            blocks.push(parse_block(name, None, block, services)?);
        }

        for (key, value) in &table {
            if key == "order" || seen.contains(key.as_str()) {
                continue;
            }
            match value {
                Value::Table(_) => log::warn!("Block '{}' is not listed in order, ignoring", key),
                _ => {
                    return Err(ConfigError::UnknownKey {
                        location: key.clone(),
                    })
                }
            }
        }

        Ok(Config { blocks })
    }
}

fn parse_block(
    name: &str,
    parent: Option<&Identity>,
    table: &Table,
    services: &mut Services,
) -> Result<BlockConfig, ConfigError> {
    let location = match parent {
        Some(parent) => format!("{}.{}", parent.instance, name),
        None => name.to_string(),
    };
    let type_location = format!("{}.type", location);

    let kind = match table.get("type") {
        Some(kind) => expect_str(kind, &type_location)?,
        None if parent.is_some() => kinds::CUSTOM,
        None => {
            return Err(ConfigError::MissingKey {
                location: type_location,
            })
        }
    };
    let mut source = kinds::create(kind, services).ok_or_else(|| ConfigError::UnknownKind {
        location: type_location.clone(),
        kind: kind.to_string(),
    })?;

    let identity = match parent {
        Some(parent) => parent.child(kind, name),
        None => Identity::new(kind, name),
    };

    let mut settings = Settings::default();
    if parent.is_some() {
        settings
            .style
            .insert("separator".to_string(), Json::Bool(false));
    }
    let mut composite = kinds::is_composite(kind).then(CompositeSettings::default);
    let mut children = Vec::new();

    for (key, value) in table {
        if key == "type" {
            continue;
        }
        let key_location = format!("{}.{}", location, key);

        if let Value::Table(sub) = value {
            match key.as_str() {
                "click" => parse_click(&mut settings.click, sub, &key_location)?,
                "slider" => parse_slider(&mut settings.slider, sub, &key_location)?,
                _ if composite.is_some() => {
                    children.push(parse_block(key, Some(&identity), sub, services)?)
                }
                _ => {
                    return Err(ConfigError::UnknownKey {
                        location: key_location,
                    })
                }
            }
            continue;
        }

        if source.configure(key, value, &key_location)? {
            continue;
        }
        if let Some(composite) = composite.as_mut() {
            if configure_composite(composite, key, value, &key_location)? {
                continue;
            }
        }
        if !configure_common(&mut settings, key, value, &key_location)? {
            return Err(ConfigError::UnknownKey {
                location: key_location,
            });
        }
    }

    validate(&settings, &location)?;
    source.validate(&settings, &location)?;

    log::debug!("Configured {} block {}", identity.kind, identity.instance);

    Ok(BlockConfig {
        identity,
        settings,
        source,
        composite,
        children,
    })
}

fn validate(settings: &Settings, location: &str) -> Result<(), ConfigError> {
    if settings.format.is_empty() {
        return Err(ConfigError::MissingKey {
            location: format!("{}.format", location),
        });
    }
    if settings.format.contains(RAMP_TOKEN) && settings.domain.ramp.is_empty() {
        return Err(ConfigError::invalid(
            &format!("{}.ramp", location),
            "format uses %ramp% but no ramp is configured",
        ));
    }
    if settings.domain.min >= settings.domain.max {
        return Err(ConfigError::invalid(
            &format!("{}.value-max", location),
            "value-max must be greater than value-min",
        ));
    }
    Ok(())
}

/// Keys every block accepts
fn configure_common(
    settings: &mut Settings,
    key: &str,
    value: &Value,
    location: &str,
) -> Result<bool, ConfigError> {
    match key {
        "format" => settings.format = expect_str(value, location)?.to_string(),
        "interval" => settings.interval = Interval::ticks(expect_unsigned(value, location)?),
        "needed" => settings.needed = expect_bool(value, location)?,
        "signal" => settings.signals = expect_signals(value, location)?,
        "ramp" => settings.domain.ramp = expect_string_array(value, location)?,
        "value-min" => settings.domain.min = expect_number(value, location)?,
        "value-max" => settings.domain.max = expect_number(value, location)?,
        "precision" => {
            settings.domain.precision = expect_at_most(value, location, MAX_PRECISION)? as usize
        }
        _ if STYLE_KEYS.contains(&key) => {
            let json = toml_to_json(value)
                .ok_or_else(|| ConfigError::wrong_type(location, "a string, number or boolean"))?;
            settings.style.insert(key.to_string(), json);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn configure_composite(
    composite: &mut CompositeSettings,
    key: &str,
    value: &Value,
    location: &str,
) -> Result<bool, ConfigError> {
    match key {
        "show-default" => composite.show_default = expect_bool(value, location)?,
        "collapse-after" => composite.collapse_after = expect_unsigned(value, location)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_click(click: &mut ClickSettings, table: &Table, location: &str) -> Result<(), ConfigError> {
    for (key, value) in table {
        let location = format!("{}.{}", location, key);
        match key.as_str() {
            "command" => click.command = Some(expect_str(value, &location)?.to_string()),
            "blocking" => click.blocking = expect_bool(value, &location)?,
            "single-instance" => click.single_instance = expect_bool(value, &location)?,
            "slider-show" => {
                click.slider = SliderToggle::from_str(expect_str(value, &location)?).ok_or_else(
                    || ConfigError::invalid(&location, "must be \"on\", \"off\" or \"toggle\""),
                )?
            }
            _ => return Err(ConfigError::UnknownKey { location }),
        }
    }
    Ok(())
}

fn parse_slider(
    slider: &mut SliderSettings,
    table: &Table,
    location: &str,
) -> Result<(), ConfigError> {
    for (key, value) in table {
        let location = format!("{}.{}", location, key);
        match key.as_str() {
            "width" => {
                slider.width = expect_at_most(value, &location, MAX_SLIDER_WIDTH)? as usize;
                if slider.width == 0 {
                    return Err(ConfigError::invalid(&location, "must be at least 1"));
                }
            }
            "fill" => slider.fill = expect_str(value, &location)?.to_string(),
            "empty" => slider.empty = expect_str(value, &location)?.to_string(),
            "command" => slider.command = Some(expect_str(value, &location)?.to_string()),
            _ => return Err(ConfigError::UnknownKey { location }),
        }
    }
    Ok(())
}

/// Absolute signal numbers from offsets relative to SIGRTMIN
fn expect_signals(value: &Value, location: &str) -> Result<Vec<i32>, ConfigError> {
    let offsets = match value {
        Value::Integer(offset) => vec![*offset],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_integer().ok_or_else(|| {
                    ConfigError::wrong_type(location, "an integer or an array of integers")
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(ConfigError::wrong_type(
                location,
                "an integer or an array of integers",
            ))
        }
    };

    let mut numbers = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let number = signals::realtime_signal(offset).ok_or_else(|| {
            let range = signals::realtime_range();
            ConfigError::invalid(
                location,
                format!(
                    "signal offset {} is outside 0..={}",
                    offset,
                    range.end() - range.start()
                ),
            )
        })?;
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    Ok(numbers)
}

fn toml_to_json(value: &Value) -> Option<Json> {
    match value {
        Value::String(s) => Some(Json::from(s.as_str())),
        Value::Integer(i) => Some(Json::from(*i)),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number),
        Value::Boolean(b) => Some(Json::Bool(*b)),
        _ => None,
    }
}

pub fn expect_str<'a>(value: &'a Value, location: &str) -> Result<&'a str, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| ConfigError::wrong_type(location, "a string"))
}

pub fn expect_bool(value: &Value, location: &str) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::wrong_type(location, "a boolean"))
}

pub fn expect_integer(value: &Value, location: &str) -> Result<i64, ConfigError> {
    value
        .as_integer()
        .ok_or_else(|| ConfigError::wrong_type(location, "an integer"))
}

/// Integer that must not be negative
pub fn expect_unsigned(value: &Value, location: &str) -> Result<u64, ConfigError> {
    let integer = expect_integer(value, location)?;
    u64::try_from(integer).map_err(|_| ConfigError::invalid(location, "must not be negative"))
}

/// Unsigned integer no larger than `max`
pub fn expect_at_most(value: &Value, location: &str, max: u64) -> Result<u64, ConfigError> {
    let integer = expect_unsigned(value, location)?;
    if integer > max {
        return Err(ConfigError::invalid(
            location,
            format!("must be at most {}", max),
        ));
    }
    Ok(integer)
}

/// Integer or float
pub fn expect_number(value: &Value, location: &str) -> Result<f64, ConfigError> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        _ => Err(ConfigError::wrong_type(location, "a number")),
    }
}

pub fn expect_string_array(value: &Value, location: &str) -> Result<Vec<String>, ConfigError> {
    let wrong = || ConfigError::wrong_type(location, "an array of strings");
    value
        .as_array()
        .ok_or_else(wrong)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong))
        .collect()
}
