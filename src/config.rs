//! Session configuration, supplied once by the embedding page.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::debounce::DEFAULT_MIN_OPEN_INTERVAL_MS;
use crate::error::{Result, XlpaneError};
use crate::store::StoreConfig;
use crate::trigger::TriggerConfig;

/// Everything the controller reads at startup. All fields have defaults, so
/// `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaneConfig {
    pub trigger: TriggerConfig,
    /// Minimum time between two automatic pane opens.
    pub min_open_interval_ms: f64,
    pub store: StoreConfig,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerConfig::default(),
            min_open_interval_ms: DEFAULT_MIN_OPEN_INTERVAL_MS,
            store: StoreConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl PaneConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration object passed from JavaScript.
    #[cfg(target_arch = "wasm32")]
    pub fn from_js(value: wasm_bindgen::JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_wasm_bindgen::from_value(value)
            .map_err(|e| XlpaneError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min_open_interval_ms.is_finite() || self.min_open_interval_ms < 0.0 {
            return Err(XlpaneError::Config(format!(
                "minOpenIntervalMs must be a non-negative number, got {}",
                self.min_open_interval_ms
            )));
        }
        self.store.region()?;
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        log::LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| XlpaneError::Config(format!("unknown log level {:?}", self.log_level)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = PaneConfig::from_json("{}").unwrap();
        assert_eq!(config, PaneConfig::default());
        assert_eq!(config.trigger.alias_name.as_deref(), Some("PaneTrigger"));
        assert_eq!(config.store.capacity, 18);
        assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Info);
    }

    #[test]
    fn test_camel_case_fields() {
        let config = PaneConfig::from_json(
            r#"{
                "trigger": {"aliasName": null, "fallbackSheet": "Sheet1", "fallbackAddress": "B2"},
                "minOpenIntervalMs": 250,
                "store": {"sheetName": "colors", "capacity": 5},
                "logLevel": "debug"
            }"#,
        )
        .unwrap();
        assert_eq!(config.trigger, TriggerConfig::fallback("Sheet1", "B2"));
        assert_eq!(config.min_open_interval_ms, 250.0);
        assert_eq!(config.store.sheet_name, "colors");
        assert_eq!(config.store.start_cell, "A1");
        assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            PaneConfig::from_json(r#"{"minOpenIntervalMs": -1}"#),
            Err(XlpaneError::Config(_))
        ));
        assert!(matches!(
            PaneConfig::from_json(r#"{"store": {"capacity": 0}}"#),
            Err(XlpaneError::Config(_))
        ));
        assert!(matches!(
            PaneConfig::from_json(r#"{"logLevel": "chatty"}"#),
            Err(XlpaneError::Config(_))
        ));
        assert!(matches!(
            PaneConfig::from_json("not json"),
            Err(XlpaneError::Json(_))
        ));
    }
}
