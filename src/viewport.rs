//! Viewport and pixel <-> geographic projection
//!
//! Layers only see the `Projection` trait. `Viewport` is the equirectangular
//! implementation the viewer drives with mouse pan and wheel zoom.

use crate::regions::Bounds;

/// Pixel <-> geocoordinate mapping for the visible viewport
pub trait Projection {
    /// Pixel size (width, height)
    fn size(&self) -> (u32, u32);

    /// (lat, lon) under pixel (x, y)
    fn pixel_to_geo(&self, x: f32, y: f32) -> (f64, f64);

    /// Pixel position of (lat, lon); may lie outside the viewport
    fn geo_to_pixel(&self, lat: f64, lon: f64) -> (f32, f32);

    /// Geographic box covered by the viewport
    fn geo_bounds(&self) -> Bounds {
        let (w, h) = self.size();
        let (lat0, lon0) = self.pixel_to_geo(0.0, 0.0);
        let (lat1, lon1) = self.pixel_to_geo(w as f32, h as f32);
        Bounds::new(lon0.min(lon1), lat0.min(lat1), lon0.max(lon1), lat0.max(lat1))
    }

    /// (lat, lon) of the viewport center
    fn geo_center(&self) -> (f64, f64) {
        let (w, h) = self.size();
        self.pixel_to_geo(w as f32 * 0.5, h as f32 * 0.5)
    }

    fn contains_pixel(&self, x: f32, y: f32) -> bool {
        let (w, h) = self.size();
        x >= 0.0 && y >= 0.0 && x < w as f32 && y < h as f32
    }
}

/// Viewport notifications delivered to layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    PanStart,
    PanEnd,
    /// Pan step, zoom or resize
    Changed,
}

const MIN_PX_PER_DEG: f64 = 2.0;
const MAX_PX_PER_DEG: f64 = 2000.0;

/// Plate carrée viewport centered on a geocoordinate
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    center_lat: f64,
    center_lon: f64,
    px_per_deg: f64,
    drag_from: Option<(f32, f32)>,
}

impl Viewport {
    pub fn new(width: u32, height: u32, center_lat: f64, center_lon: f64, px_per_deg: f64) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            center_lat,
            center_lon,
            px_per_deg: px_per_deg.clamp(MIN_PX_PER_DEG, MAX_PX_PER_DEG),
            drag_from: None,
        }
    }

    /// Viewport that fits `bounds` with a small border
    pub fn fit(width: u32, height: u32, bounds: &Bounds) -> Self {
        let (lat, lon) = bounds.center();
        let sx = width as f64 / bounds.width().max(1e-6);
        let sy = height as f64 / bounds.height().max(1e-6);
        Self::new(width, height, lat, lon, sx.min(sy) * 0.9)
    }

    pub fn px_per_deg(&self) -> f64 {
        self.px_per_deg
    }

    pub fn is_panning(&self) -> bool {
        self.drag_from.is_some()
    }

    pub fn begin_pan(&mut self, x: f32, y: f32) -> ViewportEvent {
        self.drag_from = Some((x, y));
        ViewportEvent::PanStart
    }

    /// Drag to (x, y); None when no pan is active or nothing moved
    pub fn pan_to(&mut self, x: f32, y: f32) -> Option<ViewportEvent> {
        let (fx, fy) = self.drag_from?;
        let (dx, dy) = (x - fx, y - fy);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        self.center_lon -= dx as f64 / self.px_per_deg;
        self.center_lat += dy as f64 / self.px_per_deg;
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
        self.drag_from = Some((x, y));
        Some(ViewportEvent::Changed)
    }

    pub fn end_pan(&mut self) -> Option<ViewportEvent> {
        self.drag_from.take().map(|_| ViewportEvent::PanEnd)
    }

    /// Zoom by `factor`, keeping the geocoordinate under (x, y) fixed
    pub fn zoom_at(&mut self, x: f32, y: f32, factor: f64) -> ViewportEvent {
        let (lat, lon) = self.pixel_to_geo(x, y);
        self.px_per_deg = (self.px_per_deg * factor).clamp(MIN_PX_PER_DEG, MAX_PX_PER_DEG);
        let (nx, ny) = self.geo_to_pixel(lat, lon);
        self.center_lon += (nx - x) as f64 / self.px_per_deg;
        self.center_lat -= (ny - y) as f64 / self.px_per_deg;
        ViewportEvent::Changed
    }

    pub fn resize(&mut self, width: u32, height: u32) -> ViewportEvent {
        self.width = width.max(1);
        self.height = height.max(1);
        ViewportEvent::Changed
    }
}

impl Projection for Viewport {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_to_geo(&self, x: f32, y: f32) -> (f64, f64) {
        let lon = self.center_lon + (x as f64 - self.width as f64 * 0.5) / self.px_per_deg;
        let lat = self.center_lat - (y as f64 - self.height as f64 * 0.5) / self.px_per_deg;
        (lat, lon)
    }

    fn geo_to_pixel(&self, lat: f64, lon: f64) -> (f32, f32) {
        let x = (lon - self.center_lon) * self.px_per_deg + self.width as f64 * 0.5;
        let y = (self.center_lat - lat) * self.px_per_deg + self.height as f64 * 0.5;
        (x as f32, y as f32)
    }
}
