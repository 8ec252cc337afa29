//! Observation cells and snapshots
//!
//! A snapshot is one immutable batch of readings valid at a single time. It is
//! replaced wholesale when the next one arrives.

use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// One meteorological reading at a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationCell {
    pub location_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub valid_at: Option<String>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub precip_mm: Option<f64>,
    #[serde(default)]
    pub wind_ms: Option<f64>,
    /// Degrees clockwise from north the wind blows from
    #[serde(default)]
    pub wind_dir_deg: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ObservationCell {
    pub fn new(location_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            location_id: location_id.into(),
            lat,
            lon,
            valid_at: None,
            temp_c: None,
            precip_mm: None,
            wind_ms: None,
            wind_dir_deg: None,
            is_active: true,
        }
    }

    pub fn with_temp(mut self, temp_c: f64) -> Self {
        self.temp_c = Some(temp_c);
        self
    }

    pub fn with_precip(mut self, precip_mm: f64) -> Self {
        self.precip_mm = Some(precip_mm);
        self
    }

    pub fn with_wind(mut self, speed_ms: f64, dir_deg: f64) -> Self {
        self.wind_ms = Some(speed_ms);
        self.wind_dir_deg = Some(dir_deg);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Value of `channel` if this cell takes part in interpolation
    #[inline]
    pub fn value(&self, channel: Channel) -> Option<f64> {
        if !self.is_active {
            return None;
        }
        let v = match channel {
            Channel::Temperature => self.temp_c,
            Channel::Precipitation => self.precip_mm,
            Channel::WindSpeed => self.wind_ms,
        }?;
        v.is_finite().then_some(v)
    }
}

/// Scalar channel carried by a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Precipitation,
    WindSpeed,
}

impl Channel {
    pub const ALL: [Channel; 3] = [
        Channel::Temperature,
        Channel::Precipitation,
        Channel::WindSpeed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Precipitation => "precipitation",
            Channel::WindSpeed => "wind",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "temp" | "temperature" => Ok(Channel::Temperature),
            "precip" | "precipitation" | "rain" => Ok(Channel::Precipitation),
            "wind" | "wind_speed" | "windspeed" => Ok(Channel::WindSpeed),
            other => Err(format!("unknown channel `{}`", other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One batch of cells from the data service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub obs_time: Option<String>,
    pub cells: Vec<ObservationCell>,
}

impl Snapshot {
    pub fn new(cells: Vec<ObservationCell>) -> Self {
        Self {
            obs_time: None,
            cells,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Cells that contribute to `channel`
    pub fn count_with(&self, channel: Channel) -> usize {
        self.cells.iter().filter(|c| c.value(channel).is_some()).count()
    }
}
