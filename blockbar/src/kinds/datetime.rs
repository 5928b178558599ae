use crate::block::{Reading, RefreshContext, Settings, Source};
use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use std::fmt::Write;

/// Wall clock, the block format is a strftime pattern
pub struct DateTime;

impl DateTime {
    pub fn new() -> Self {
        DateTime
    }
}

fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| item == Item::Error)
}

impl Source for DateTime {
    fn validate(&self, settings: &Settings, location: &str) -> Result<(), ConfigError> {
        if !is_valid_pattern(&settings.format) {
            return Err(ConfigError::invalid(
                &format!("{}.format", location),
                "invalid strftime pattern",
            ));
        }
        Ok(())
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let local = ctx.now.with_timezone(&Local);
        let mut text = String::new();
        write!(text, "{}", local.format(ctx.format))
            .map_err(|_| anyhow::anyhow!("cannot format time with '{}'", ctx.format))?;
        Ok(Reading::new().with_format(text))
    }
}
