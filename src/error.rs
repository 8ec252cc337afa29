//! Error types
//!
//! Every failure here is recoverable: callers fall back to an empty field,
//! a fail-open mask, or default configuration and keep rendering. Each has a
//! different fallback, so there is no crate-wide error type.

use thiserror::Error;

/// Failures loading or parsing the region boundary
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to read boundary file: {0}")]
    Io(#[from] std::io::Error),

    #[error("boundary is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported GeoJSON type `{0}`")]
    UnsupportedType(String),

    #[error("malformed GeoJSON: {0}")]
    Malformed(&'static str),

    #[error("boundary has no polygon with at least three vertices")]
    Empty,
}

/// Failures retrieving an observation snapshot
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MQTT: {0}")]
    Mqtt(String),

    #[error("snapshot feed disconnected")]
    Disconnected,
}

/// Failures loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scale range for {channel} is empty (min {min} >= max {max})")]
    EmptyRange {
        channel: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_snapshot(path: &str) -> Result<String, FeedError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_boundary(json: &str) -> Result<serde_json::Value, GeometryError> {
        Ok(serde_json::from_str(json)?)
    }

    #[test]
    fn test_sources_convert_with_question_mark() {
        assert!(matches!(
            read_snapshot("/nonexistent/snapshot.json"),
            Err(FeedError::Io(_))
        ));
        let err = parse_boundary("{ not json").unwrap_err();
        assert!(err.to_string().starts_with("boundary is not valid JSON"));
    }

    #[test]
    fn test_config_messages_name_the_setting() {
        let err = ConfigError::EmptyRange {
            channel: "temperature",
            min: 40.0,
            max: 10.0,
        };
        assert_eq!(
            err.to_string(),
            "scale range for temperature is empty (min 40 >= max 10)"
        );
        assert_eq!(
            ConfigError::NotPositive("block_size").to_string(),
            "block_size must be greater than zero"
        );
    }
}
