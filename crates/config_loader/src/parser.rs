//! Configuration parsing
//!
//! Supports TOML (primary) and JSON (optional) formats.

use contracts::{ContractError, RangeBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML blueprint
pub fn parse_toml(content: &str) -> Result<RangeBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON blueprint
pub fn parse_json(content: &str) -> Result<RangeBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a blueprint in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RangeBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[session]
name = "morning_practice"

[[devices]]
id = "timer1"
addr = "AA:BB:CC:00:00:01"
role = "timer"

[[devices]]
id = "plate_a"
addr = "AA:BB:CC:00:00:02"
role = "sensor"
target = "A"

[[sinks]]
name = "console"
sink_type = "log"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.name, "morning_practice");
        assert_eq!(bp.devices.len(), 2);
        assert_eq!(bp.devices[1].target.as_deref(), Some("A"));
        // untouched sections fall back to defaults
        assert_eq!(bp.correlation.window_s, 2.0);
        assert_eq!(bp.detection.onset_threshold, 30.0);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "session": { "name": "match_day" },
            "devices": [
                { "id": "timer1", "addr": "AA:BB:CC:00:00:01", "role": "timer" },
                { "id": "plate_a", "addr": "AA:BB:CC:00:00:02", "role": "sensor", "target": "A" }
            ],
            "sinks": [{ "name": "console", "sink_type": "log" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().devices.len(), 2);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
