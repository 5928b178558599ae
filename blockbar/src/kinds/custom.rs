use crate::block::{shell, Reading, RefreshContext, Source};
use crate::config::expect_str;
use crate::error::ConfigError;
use anyhow::{bail, Context};
use std::process::Stdio;

/// Text and value produced by shell commands
#[derive(Default)]
pub struct Custom {
    text_command: Option<String>,
    value_command: Option<String>,
}

impl Custom {
    pub fn new() -> Self {
        Self::default()
    }
}

/// First line printed by `command`
///
/// The exit status does not matter, only whether a line came out.
fn first_line(command: &str) -> anyhow::Result<String> {
    let output = shell(command)
        .stdout(Stdio::piped())
        .output()
        .with_context(|| format!("running '{}'", command))?;
    if !output.status.success() {
        log::debug!("'{}' exited with {}", command, output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.lines().next() {
        Some(line) => Ok(line.to_string()),
        None => bail!("'{}' printed nothing", command),
    }
}

impl Source for Custom {
    fn configure(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        match key {
            "text-command" => self.text_command = Some(expect_str(value, location)?.to_string()),
            "value-command" => self.value_command = Some(expect_str(value, location)?.to_string()),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let mut reading = Reading::new();

        if let Some(command) = &self.text_command {
            let mut text = first_line(command)?;
            if text.is_empty() {
                text = "<error>".to_string();
            }
            reading = reading.field("text", text);
        }

        if let Some(command) = &self.value_command {
            let line = first_line(command)?;
            let value: f64 = line
                .trim()
                .parse()
                .with_context(|| format!("'{}' is not a number", line.trim()))?;
            reading = reading.value(value);
        }

        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Domain;
    use chrono::Utc;

    fn refresh(source: &mut Custom) -> anyhow::Result<Reading> {
        let domain = Domain::default();
        source.refresh(&RefreshContext {
            now: Utc::now(),
            format: "%text%",
            domain: &domain,
        })
    }

    #[test]
    fn test_text_and_value_commands() {
        let mut source = Custom {
            text_command: Some("printf 'hello\\nworld\\n'".to_string()),
            value_command: Some("echo ' 42.5 '".to_string()),
        };
        let reading = refresh(&mut source).unwrap();
        assert_eq!(reading.fields, vec![("text", "hello".to_string())]);
        assert_eq!(reading.value, Some(42.5));
    }

    #[test]
    fn test_nonzero_exit_with_output() {
        let mut source = Custom {
            text_command: Some("echo 'VPN down'; exit 1".to_string()),
            value_command: Some("echo 7; exit 2".to_string()),
        };
        let reading = refresh(&mut source).unwrap();
        assert_eq!(reading.fields, vec![("text", "VPN down".to_string())]);
        assert_eq!(reading.value, Some(7.0));
    }

    #[test]
    fn test_failures() {
        let mut failing = Custom {
            text_command: Some("exit 3".to_string()),
            value_command: None,
        };
        assert!(refresh(&mut failing).is_err());

        let mut not_a_number = Custom {
            text_command: None,
            value_command: Some("echo many".to_string()),
        };
        assert!(refresh(&mut not_a_number).is_err());
    }

    #[test]
    fn test_static_block() {
        let reading = refresh(&mut Custom::new()).unwrap();
        assert_eq!(reading, Reading::new());
    }
}
