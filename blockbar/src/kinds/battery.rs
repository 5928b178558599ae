use crate::block::{Reading, RefreshContext, Source};
use crate::config::{expect_str, expect_string_array};
use crate::error::ConfigError;
use crate::template::{self, VALUE_TOKEN};
use anyhow::Context;
use std::collections::HashMap;
use std::path::PathBuf;

const POWER_SUPPLY: &str = "/sys/class/power_supply";

/// Charge level and status from the power supply class
pub struct Battery {
    uevent: PathBuf,
    ramp_charging: Vec<String>,
}

impl Battery {
    pub fn new() -> Self {
        Self {
            uevent: uevent_path("BAT0"),
            ramp_charging: Vec::new(),
        }
    }
}

fn uevent_path(battery: &str) -> PathBuf {
    PathBuf::from(POWER_SUPPLY).join(battery).join("uevent")
}

/// Parse `KEY=value` lines of a uevent file
fn parse_uevent(text: &str) -> HashMap<&str, &str> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .collect()
}

impl Source for Battery {
    fn configure(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        match key {
            "battery" => self.uevent = uevent_path(expect_str(value, location)?),
            "ramp-charging" => self.ramp_charging = expect_string_array(value, location)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let text = std::fs::read_to_string(&self.uevent)
            .with_context(|| format!("reading {}", self.uevent.display()))?;
        let info = parse_uevent(&text);

        let capacity: f64 = info
            .get("POWER_SUPPLY_CAPACITY")
            .context("no capacity reported")?
            .trim()
            .parse()
            .context("malformed capacity")?;
        let status = info
            .get("POWER_SUPPLY_STATUS")
            .context("no status reported")?
            .trim();

        let mut reading = Reading::new()
            .field("percentage", VALUE_TOKEN)
            .field("status", status)
            .value(capacity);

        if status == "Charging" {
            let domain = ctx.domain;
            if let Some(label) =
                template::ramp_label(capacity, domain.min, domain.max, &self.ramp_charging)
            {
                reading = reading.field("ramp", label);
            }
        }

        Ok(reading)
    }
}
