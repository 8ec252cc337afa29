//! Renderer configuration
//!
//! Read once at startup. Normalization ranges are fixed per channel rather than
//! taken from each snapshot's min/max, so colors mean the same thing across
//! snapshots. Changing them means restarting the renderer.

use crate::error::ConfigError;
use crate::interp::IdwParams;
use crate::observation::Channel;
use crate::particles::AdvectionParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed value range mapped onto [0, 1] for coloring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` in the range, clamped to [0, 1]
    pub fn normalize(&self, value: f64) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleRanges {
    pub temperature: ScaleRange,
    pub precipitation: ScaleRange,
    pub wind: ScaleRange,
}

impl Default for ScaleRanges {
    fn default() -> Self {
        Self {
            temperature: ScaleRange::new(10.0, 40.0),
            precipitation: ScaleRange::new(0.0, 50.0),
            wind: ScaleRange::new(0.0, 20.0),
        }
    }
}

impl ScaleRanges {
    pub fn for_channel(&self, channel: Channel) -> ScaleRange {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Precipitation => self.precipitation,
            Channel::WindSpeed => self.wind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub max_age: u32,
    /// Simulated seconds advanced per tick
    pub time_scale: f64,
    pub calm_threshold: f64,
    pub respawn_attempts: u32,
    /// Trail alpha kept per tick
    pub trail_fade: f32,
    pub trail_color: (u8, u8, u8),
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        let advect = AdvectionParams::default();
        Self {
            count: 1500,
            max_age: advect.max_age,
            time_scale: advect.time_scale,
            calm_threshold: advect.calm_threshold,
            respawn_attempts: advect.respawn_attempts,
            trail_fade: 0.97,
            trail_color: (170, 180, 200),
            seed: 0x5EED_F1E1D,
        }
    }
}

impl ParticleConfig {
    pub fn advection(&self) -> AdvectionParams {
        AdvectionParams {
            max_age: self.max_age,
            time_scale: self.time_scale,
            calm_threshold: self.calm_threshold,
            respawn_attempts: self.respawn_attempts,
        }
    }
}

/// Where snapshots come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedConfig {
    /// Re-read a JSON snapshot file every `interval_secs`
    File { path: PathBuf, interval_secs: f32 },
    /// Each publish on `topic` is one snapshot
    Mqtt { host: String, port: u16, topic: String },
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ranges: ScaleRanges,
    /// Side of a raster block in pixels
    pub block_size: u32,
    pub idw_k: usize,
    pub idw_power: f64,
    /// Fast-reject margin around the boundary box, degrees
    pub bbox_margin: f64,
    pub particles: ParticleConfig,
    pub boundary: Option<PathBuf>,
    pub feed: FeedConfig,
    pub background: (u8, u8, u8),
    pub outline: (u8, u8, u8),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ranges: ScaleRanges::default(),
            block_size: 6,
            idw_k: 8,
            idw_power: 2.0,
            bbox_margin: crate::regions::BBOX_MARGIN_DEG,
            particles: ParticleConfig::default(),
            boundary: None,
            feed: FeedConfig::None,
            background: (12, 16, 24),
            outline: (150, 150, 160),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            let r = self.ranges.for_channel(channel);
            // NaN bounds fail this too
            if r.min.partial_cmp(&r.max) != Some(std::cmp::Ordering::Less) {
                return Err(ConfigError::EmptyRange {
                    channel: channel.name(),
                    min: r.min,
                    max: r.max,
                });
            }
        }
        if self.block_size == 0 {
            return Err(ConfigError::NotPositive("block_size"));
        }
        if self.idw_k == 0 {
            return Err(ConfigError::NotPositive("idw_k"));
        }
        if self.idw_power.is_nan() || self.idw_power <= 0.0 {
            return Err(ConfigError::NotPositive("idw_power"));
        }
        if self.particles.max_age == 0 {
            return Err(ConfigError::NotPositive("particles.max_age"));
        }
        Ok(())
    }

    pub fn idw(&self) -> IdwParams {
        IdwParams {
            k: self.idw_k,
            power: self.idw_power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let c = Config::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.block_size, 6);
        assert_eq!(c.idw(), IdwParams::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let c = Config::from_json(r#"{"ranges": {"temperature": {"min": 0, "max": 35}}}"#).unwrap();
        assert_eq!(c.ranges.temperature, ScaleRange::new(0.0, 35.0));
        assert_eq!(c.ranges.wind, ScaleRange::new(0.0, 20.0));
        assert_eq!(c.particles.count, 1500);
    }

    #[test]
    fn test_feed_variants_parse() {
        let c = Config::from_json(
            r#"{"feed": {"kind": "mqtt", "host": "broker.local", "port": 1883,
                         "topic": "obs/latest"}}"#,
        )
        .unwrap();
        assert!(matches!(c.feed, FeedConfig::Mqtt { port: 1883, .. }));
    }

    #[test]
    fn test_rejects_empty_range() {
        let err = Config::from_json(r#"{"ranges": {"wind": {"min": 5, "max": 5}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRange { channel: "wind", .. }));
        let err = Config::from_json(r#"{"block_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive("block_size")));
    }

    #[test]
    fn test_normalize_clamps() {
        let r = ScaleRange::new(10.0, 40.0);
        assert_eq!(r.normalize(25.0), 0.5);
        assert_eq!(r.normalize(-5.0), 0.0);
        assert_eq!(r.normalize(99.0), 1.0);
        assert_eq!(r.normalize(f64::NAN), 0.0);
        assert_eq!(ScaleRange::new(3.0, 3.0).normalize(3.0), 0.0);
    }
}
