//! Continuous wind vector field built from station observations
//!
//! Direction convention: `wind_dir_deg` is meteorological, degrees clockwise
//! from north the wind blows FROM. The stored components describe where the
//! air moves TO: `u` east, `v` north, so a north wind (0°) has `v < 0`.

use crate::interp::{IdwParams, Neighborhood};
use crate::observation::ObservationCell;

/// Field value at one point, m/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub u: f64,
    pub v: f64,
    /// Speed recomputed from the interpolated components
    pub s: f64,
}

impl WindSample {
    pub fn new(u: f64, v: f64) -> Self {
        Self {
            u,
            v,
            s: u.hypot(v),
        }
    }
}

/// Split speed and "from" direction into east/north motion components
pub fn decompose(speed_ms: f64, dir_from_deg: f64) -> (f64, f64) {
    let rad = dir_from_deg.to_radians();
    (-speed_ms * rad.sin(), -speed_ms * rad.cos())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WindVector {
    lat: f64,
    lon: f64,
    u: f64,
    v: f64,
}

/// Wind field bound to one snapshot. Immutable; rebuild for the next snapshot.
#[derive(Debug, Clone, Default)]
pub struct WindField {
    vectors: Vec<WindVector>,
    params: IdwParams,
}

impl WindField {
    pub fn build(cells: &[ObservationCell]) -> Self {
        Self::build_with(cells, IdwParams::default())
    }

    pub fn build_with(cells: &[ObservationCell], params: IdwParams) -> Self {
        let vectors = cells
            .iter()
            .filter(|c| c.is_active)
            .filter_map(|c| {
                let speed = c.wind_ms.filter(|s| s.is_finite())?;
                let dir = c.wind_dir_deg.filter(|d| d.is_finite())?;
                let (u, v) = decompose(speed, dir);
                Some(WindVector {
                    lat: c.lat,
                    lon: c.lon,
                    u,
                    v,
                })
            })
            .collect();
        Self { vectors, params }
    }

    /// Interpolated wind at (lat, lon), None when no station reports wind.
    /// One neighbour selection feeds both components.
    pub fn sample(&self, lat: f64, lon: f64) -> Option<WindSample> {
        let samples = self.vectors.iter().map(|w| (w.lat, w.lon, (w.u, w.v)));
        let hood = Neighborhood::select(lat, lon, samples, &self.params);
        let u = hood.blend(|&(u, _)| u)?;
        let v = hood.blend(|&(_, v)| v)?;
        Some(WindSample::new(u, v))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
