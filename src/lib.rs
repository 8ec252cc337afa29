//! Live weather observations rendered as continuous fields over a country map.
//!
//! Sparse station readings are interpolated (inverse distance weighting) into
//! temperature and precipitation rasters clipped to a region boundary, and a
//! wind vector field drives an animated particle-trail layer. Everything
//! renders into software `PixelBuffer`s; the `display` feature adds an SDL2
//! viewer on top.

pub mod app;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod feed;
pub mod interp;
pub mod layers;
pub mod observation;
pub mod particles;
pub mod regions;
pub mod scheduler;
pub mod status;
pub mod util;
pub mod viewport;
pub mod wind;

pub use app::App;
pub use config::Config;
pub use error::{ConfigError, FeedError, GeometryError};
pub use observation::{Channel, ObservationCell, Snapshot};
pub use regions::{RegionGeometry, RegionMask};
pub use wind::{WindField, WindSample};
