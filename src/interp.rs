//! Inverse-distance-weighted interpolation
//!
//! Local, bounded-neighbourhood IDW in planar degree space. Only the `k`
//! nearest samples contribute, so one distant station cannot flatten a local
//! signal. No geodesic correction: the national extent is small enough.

use crate::observation::{Channel, ObservationCell};

/// Squared distance below which the query is treated as sitting on a sample
pub const COINCIDENT_DIST_SQ: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdwParams {
    /// Neighbours used per query
    pub k: usize,
    /// Exponent applied to the distance (not the squared distance)
    pub power: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self { k: 8, power: 2.0 }
    }
}

/// The samples chosen for one query point
#[derive(Debug, Clone, PartialEq)]
pub enum Neighborhood<T> {
    /// No eligible samples
    Empty,
    /// Query coincides with a sample; use it verbatim
    Coincident(T),
    /// Up to `k` nearest samples with their weights, nearest first
    Weighted {
        neighbors: Vec<(f64, T)>,
        total_weight: f64,
    },
}

impl<T: Copy> Neighborhood<T> {
    /// Pick the neighbourhood of (lat, lon) among `(lat, lon, payload)` samples
    pub fn select<I>(lat: f64, lon: f64, samples: I, params: &IdwParams) -> Self
    where
        I: IntoIterator<Item = (f64, f64, T)>,
    {
        let mut by_dist: Vec<(f64, T)> = samples
            .into_iter()
            .map(|(s_lat, s_lon, t)| {
                let d_lat = s_lat - lat;
                let d_lon = s_lon - lon;
                (d_lat * d_lat + d_lon * d_lon, t)
            })
            .collect();

        if by_dist.is_empty() {
            return Neighborhood::Empty;
        }

        by_dist.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (nearest_d2, nearest) = by_dist[0];
        if nearest_d2 < COINCIDENT_DIST_SQ {
            return Neighborhood::Coincident(nearest);
        }

        let k = params.k.max(1).min(by_dist.len());
        by_dist.truncate(k);

        let half_power = params.power * 0.5;
        let mut total_weight = 0.0;
        for entry in &mut by_dist {
            let w = 1.0 / entry.0.powf(half_power);
            entry.0 = w;
            total_weight += w;
        }

        Neighborhood::Weighted {
            neighbors: by_dist,
            total_weight,
        }
    }

    /// Weighted average of `value(payload)` over the neighbourhood
    pub fn blend(&self, value: impl Fn(&T) -> f64) -> Option<f64> {
        match self {
            Neighborhood::Empty => None,
            Neighborhood::Coincident(t) => Some(value(t)),
            Neighborhood::Weighted {
                neighbors,
                total_weight,
            } => {
                let nearest = value(&neighbors[0].1);
                if *total_weight <= 0.0 || !total_weight.is_finite() {
                    return Some(nearest);
                }
                let sum: f64 = neighbors.iter().map(|(w, t)| w * value(t)).sum();
                let out = sum / total_weight;
                Some(if out.is_finite() { out } else { nearest })
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Neighborhood::Empty)
    }
}

/// IDW value of `channel` at (lat, lon) with the default parameters
pub fn interpolate(lat: f64, lon: f64, cells: &[ObservationCell], channel: Channel) -> Option<f64> {
    interpolate_with(lat, lon, cells, channel, &IdwParams::default())
}

pub fn interpolate_with(
    lat: f64,
    lon: f64,
    cells: &[ObservationCell],
    channel: Channel,
    params: &IdwParams,
) -> Option<f64> {
    let samples = cells
        .iter()
        .filter_map(|c| c.value(channel).map(|v| (c.lat, c.lon, v)));
    Neighborhood::select(lat, lon, samples, params).blend(|v| *v)
}
