//! Restaurant Settings Model

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESTAURANT_NAME: &str = "RestoPOS";
pub const DEFAULT_CURRENCY: &str = "₹";
pub const DEFAULT_TAX_RATE: f64 = 0.05;

/// Restaurant settings (singleton, served by the REST API)
///
/// Every field is optional; printing falls back to the defaults above.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Fraction, e.g. 0.05 for 5%
    #[serde(default)]
    pub tax_rate: Option<f64>,
}

impl Settings {
    pub fn restaurant_name(&self) -> &str {
        self.restaurant_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_RESTAURANT_NAME)
    }

    pub fn currency(&self) -> &str {
        self.currency
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate.unwrap_or(DEFAULT_TAX_RATE)
    }

    /// Tax rate as a whole percentage (`rate * 100`, rounded)
    pub fn tax_percent(&self) -> i64 {
        (self.tax_rate() * 100.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.restaurant_name(), "RestoPOS");
        assert_eq!(settings.currency(), "₹");
        assert_eq!(settings.tax_percent(), 5);
    }

    #[test]
    fn test_tax_percent_rounding() {
        let settings = Settings {
            tax_rate: Some(0.125),
            ..Default::default()
        };
        assert_eq!(settings.tax_percent(), 13);

        let settings = Settings {
            tax_rate: Some(0.18),
            ..Default::default()
        };
        assert_eq!(settings.tax_percent(), 18);
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: Settings = serde_json::from_str(r#"{"currency": "$"}"#).unwrap();
        assert_eq!(settings.currency(), "$");
        assert_eq!(settings.restaurant_name(), "RestoPOS");
    }
}
