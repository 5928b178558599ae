//! Format template rendering
//!
//! Formats are plain strings containing `%token%` placeholders. Substitution
//! is literal token replacement; there is no escaping, nesting or
//! conditional logic.

/// Placeholder replaced with the block's numeric value
pub const VALUE_TOKEN: &str = "%value%";

/// Placeholder replaced with the ramp label for the block's value
pub const RAMP_TOKEN: &str = "%ramp%";

/// Numeric domain a block's value is displayed in
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
    pub precision: usize,
    pub ramp: Vec<String>,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            precision: 0,
            ramp: Vec::new(),
        }
    }
}

impl Domain {
    /// Ramp label for `value`, `None` when no ramp is configured
    pub fn ramp_label(&self, value: f64) -> Option<&str> {
        ramp_label(value, self.min, self.max, &self.ramp)
    }

    /// Position of `value` inside the domain, clamped to `0.0..=1.0`
    pub fn fraction(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Build the placeholder for a named field
pub fn token(name: &str) -> String {
    format!("%{}%", name)
}

/// Bucket index of `value` in a ramp of `len` labels spanning `[min, max]`
///
/// Total for any input: values at or below `min` land in the first bucket,
/// values at or above `max` in the last one. Returns 0 for an empty ramp.
pub fn ramp_index(value: f64, min: f64, max: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    if value <= min {
        return 0;
    }
    if value >= max {
        return last;
    }

    let width = (max - min) / len as f64;
    let index = ((value - min) / width).floor();
    // NaN saturates to 0 in the cast
    (index as usize).min(last)
}

/// Ramp label for `value`, `None` for an empty ramp
pub fn ramp_label(value: f64, min: f64, max: f64, labels: &[String]) -> Option<&str> {
    if labels.is_empty() {
        return None;
    }
    Some(labels[ramp_index(value, min, max, labels.len())].as_str())
}

/// Format a value with a fixed number of decimals
pub fn format_value(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// Render a format string
///
/// Named fields are substituted first so a field may itself expand to
/// `%value%` or `%ramp%`. The value tokens are only touched when a value
/// exists; otherwise they are left in place verbatim.
pub fn render(
    format: &str,
    fields: &[(&'static str, String)],
    value: Option<f64>,
    domain: &Domain,
) -> String {
    let mut text = format.to_string();

    for (name, replacement) in fields {
        let placeholder = token(name);
        if text.contains(&placeholder) {
            text = text.replace(&placeholder, replacement);
        }
    }

    if let Some(value) = value {
        if text.contains(VALUE_TOKEN) {
            text = text.replace(VALUE_TOKEN, &format_value(value, domain.precision));
        }
        if text.contains(RAMP_TOKEN) {
            if let Some(label) = domain.ramp_label(value) {
                text = text.replace(RAMP_TOKEN, label);
            }
        }
    }

    text
}

/// Horizontal gauge of `value` across the domain, `width` cells wide
pub fn gauge(value: f64, domain: &Domain, width: usize, fill: &str, empty: &str) -> String {
    let filled = (domain.fraction(value) * width as f64).round() as usize;
    let filled = filled.min(width);
    let mut text = fill.repeat(filled);
    text.push_str(&empty.repeat(width - filled));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(0.0, "a")]
    #[case(33.0, "b")]
    #[case(98.9, "c")]
    #[case(150.0, "c")]
    #[case(-20.0, "a")]
    #[case(99.0, "c")]
    #[case(32.9, "a")]
    #[case(66.0, "c")]
    fn test_ramp_label(#[case] value: f64, #[case] expected: &str) {
        let ramp = labels(&["a", "b", "c"]);
        assert_eq!(ramp_label(value, 0.0, 99.0, &ramp), Some(expected));
    }

    #[test]
    fn test_ramp_index_is_bounded() {
        for len in 1..8 {
            for step in -50..250 {
                let value = step as f64 * 0.7;
                let index = ramp_index(value, 10.0, 90.0, len);
                assert!(index < len, "value {} len {} gave {}", value, len, index);
            }
            assert_eq!(ramp_index(f64::NAN, 10.0, 90.0, len), 0);
            assert_eq!(ramp_index(f64::INFINITY, 10.0, 90.0, len), len - 1);
            assert_eq!(ramp_index(f64::NEG_INFINITY, 10.0, 90.0, len), 0);
        }
    }

    #[test]
    fn test_ramp_respects_offset_domain() {
        let ramp = labels(&["cold", "warm", "hot"]);
        assert_eq!(ramp_label(40.0, 30.0, 60.0, &ramp), Some("warm"));
        assert_eq!(ramp_label(30.0, 30.0, 60.0, &ramp), Some("cold"));
        assert_eq!(ramp_label(59.9, 30.0, 60.0, &ramp), Some("hot"));
    }

    #[test]
    fn test_empty_ramp() {
        assert_eq!(ramp_label(10.0, 0.0, 100.0, &[]), None);
        assert_eq!(ramp_index(10.0, 0.0, 100.0, 0), 0);
    }

    #[test]
    fn test_render_substitutions() {
        let domain = Domain {
            precision: 1,
            ramp: labels(&["low", "high"]),
            ..Domain::default()
        };
        let fields = [("status", "Charging".to_string())];
        let text = render("%ramp% %value% %status%", &fields, Some(75.24), &domain);
        assert_eq!(text, "high 75.2 Charging");
    }

    #[test]
    fn test_render_without_value_keeps_tokens() {
        let domain = Domain {
            ramp: labels(&["x"]),
            ..Domain::default()
        };
        let text = render("%ramp% %value%", &[], None, &domain);
        assert_eq!(text, "%ramp% %value%");
    }

    #[test]
    fn test_field_expanding_to_value_token() {
        let domain = Domain::default();
        let fields = [("percentage", VALUE_TOKEN.to_string())];
        assert_eq!(render("%percentage%%", &fields, Some(42.0), &domain), "42%");
    }

    #[test]
    fn test_gauge() {
        let domain = Domain::default();
        assert_eq!(gauge(50.0, &domain, 4, "#", "-"), "##--");
        assert_eq!(gauge(250.0, &domain, 4, "#", "-"), "####");
        assert_eq!(gauge(-5.0, &domain, 4, "#", "-"), "----");
    }
}
