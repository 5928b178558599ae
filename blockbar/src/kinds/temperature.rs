use crate::block::{Reading, RefreshContext, Source};
use crate::config::expect_str;
use crate::error::ConfigError;
use anyhow::Context;
use std::path::PathBuf;

const THERMAL: &str = "/sys/class/thermal";

/// Thermal zone temperature in degrees Celsius
pub struct Temperature {
    path: PathBuf,
}

impl Temperature {
    pub fn new() -> Self {
        Self {
            path: zone_path("thermal_zone0"),
        }
    }
}

fn zone_path(zone: &str) -> PathBuf {
    PathBuf::from(THERMAL).join(zone).join("temp")
}

impl Source for Temperature {
    fn configure(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        if key != "thermal-zone" {
            return Ok(false);
        }
        self.path = zone_path(expect_str(value, location)?);
        Ok(true)
    }

    fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let millidegrees: i64 = text.trim().parse().context("malformed temperature")?;

        Ok(Reading::new()
            .field("temperature", (millidegrees / 1000).to_string())
            .value(millidegrees as f64 / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Domain;
    use chrono::Utc;

    #[test]
    fn test_reads_millidegrees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, "47500\n").unwrap();

        let mut source = Temperature { path };
        let domain = Domain::default();
        let reading = source
            .refresh(&RefreshContext {
                now: Utc::now(),
                format: "%temperature%",
                domain: &domain,
            })
            .unwrap();
        assert_eq!(reading.fields, vec![("temperature", "47".to_string())]);
        assert_eq!(reading.value, Some(47.5));
    }

    #[test]
    fn test_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, "hot\n").unwrap();

        let mut source = Temperature { path };
        let domain = Domain::default();
        let ctx = RefreshContext {
            now: Utc::now(),
            format: "%temperature%",
            domain: &domain,
        };
        assert!(source.refresh(&ctx).is_err());
    }
}
