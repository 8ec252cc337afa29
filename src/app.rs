//! Animation driver
//!
//! Owns the region mask, the viewport, the shared field slots and the layers.
//! Once per tick it drains the feed, lets each layer repaint, and composites
//! the frame: base color, scalar fields, region outline, then particle trails.

use crate::config::Config;
use crate::display::{BlendMode, PixelBuffer};
use crate::feed::{Feed, FetchResult};
use crate::layers::{FieldLayer, Layer, ParticleLayer, WindBackgroundLayer};
use crate::observation::{Channel, Snapshot};
use crate::regions::RegionMask;
use crate::scheduler::Slot;
use crate::status::{Status, StatusSink};
use crate::viewport::{Projection, Viewport, ViewportEvent};
use crate::wind::WindField;
use std::rc::Rc;
use tracing::{info, warn};

/// Pixels per degree when there is no boundary to fit
const WORLD_PX_PER_DEG: f64 = 2.0;

struct Entry {
    /// Toggle group the layer belongs to
    group: Channel,
    layer: Box<dyn Layer>,
}

pub struct App {
    config: Config,
    mask: Rc<RegionMask>,
    viewport: Viewport,
    snapshot: Slot<Snapshot>,
    wind: Slot<WindField>,
    layers: Vec<Entry>,
    selected: Option<Channel>,
    status: Rc<dyn StatusSink>,
    feed: Option<Feed>,
    frame: PixelBuffer,
}

impl App {
    pub fn new(
        config: Config,
        mask: RegionMask,
        width: u32,
        height: u32,
        status: Rc<dyn StatusSink>,
    ) -> Self {
        let viewport = match mask.geometry().and_then(|g| g.bounds()) {
            Some(bounds) => Viewport::fit(width, height, &bounds),
            None => Viewport::new(width, height, 0.0, 0.0, WORLD_PX_PER_DEG),
        };

        let mask = Rc::new(mask);
        let snapshot = Slot::new();
        let wind = Slot::new();

        let layers = vec![
            Entry {
                group: Channel::Temperature,
                layer: Box::new(FieldLayer::new(
                    Channel::Temperature,
                    &config,
                    Rc::clone(&mask),
                    snapshot.clone(),
                )),
            },
            Entry {
                group: Channel::Precipitation,
                layer: Box::new(FieldLayer::new(
                    Channel::Precipitation,
                    &config,
                    Rc::clone(&mask),
                    snapshot.clone(),
                )),
            },
            Entry {
                group: Channel::WindSpeed,
                layer: Box::new(WindBackgroundLayer::new(&config, Rc::clone(&mask), wind.clone())),
            },
            Entry {
                group: Channel::WindSpeed,
                layer: Box::new(ParticleLayer::new(&config, Rc::clone(&mask), wind.clone())),
            },
        ];

        Self {
            config,
            mask,
            viewport,
            snapshot,
            wind,
            layers,
            selected: None,
            status,
            feed: None,
            frame: PixelBuffer::with_size(width.max(1), height.max(1)),
        }
    }

    /// Attach a snapshot feed; status reads `Loading` until the first result
    pub fn with_feed(mut self, feed: Feed) -> Self {
        self.feed = Some(feed);
        self.status.report_status(Status::Loading);
        self
    }

    /// Install a fetch outcome. A failure clears both fields rather than
    /// leaving stale data on screen.
    pub fn apply_fetch(&mut self, result: FetchResult) {
        match result {
            Ok(snapshot) => {
                let field = WindField::build_with(&snapshot.cells, self.config.idw());
                info!(
                    cells = snapshot.cells.len(),
                    wind_stations = field.len(),
                    obs_time = snapshot.obs_time.as_deref().unwrap_or("-"),
                    "snapshot applied"
                );
                self.snapshot.set(snapshot);
                self.wind.set(field);
                self.status.report_status(Status::Ok);
            },
            Err(e) => {
                warn!(error = %e, "snapshot fetch failed, clearing fields");
                self.snapshot.clear();
                self.wind.clear();
                self.status.report_status(Status::Error);
            },
        }
    }

    /// Apply the newest feed result, if one arrived. Returns true if it did.
    pub fn poll_feed(&mut self) -> bool {
        let Some(result) = self.feed.as_ref().and_then(Feed::poll) else {
            return false;
        };
        self.apply_fetch(result);
        true
    }

    /// Show one layer group and hide the rest; None hides everything
    pub fn select(&mut self, group: Option<Channel>) {
        self.selected = group;
        for entry in &mut self.layers {
            entry.layer.set_visible(Some(entry.group) == group);
        }
        info!(layer = group.map_or("none", |g| g.name()), "layer selected");
    }

    /// Select `group`, or clear the selection if it is already showing
    pub fn toggle(&mut self, group: Channel) {
        if self.selected == Some(group) {
            self.select(None);
        } else {
            self.select(Some(group));
        }
    }

    pub fn selected(&self) -> Option<Channel> {
        self.selected
    }

    fn dispatch(&mut self, event: ViewportEvent) {
        for entry in &mut self.layers {
            entry.layer.on_viewport(event, &self.viewport);
        }
    }

    pub fn begin_pan(&mut self, x: f32, y: f32) {
        let event = self.viewport.begin_pan(x, y);
        self.dispatch(event);
    }

    pub fn pan_to(&mut self, x: f32, y: f32) {
        if let Some(event) = self.viewport.pan_to(x, y) {
            self.dispatch(event);
        }
    }

    pub fn end_pan(&mut self) {
        if let Some(event) = self.viewport.end_pan() {
            self.dispatch(event);
        }
    }

    pub fn zoom_at(&mut self, x: f32, y: f32, factor: f64) {
        let event = self.viewport.zoom_at(x, y, factor);
        self.dispatch(event);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let event = self.viewport.resize(width, height);
        let (w, h) = self.viewport.size();
        self.frame.resize(w, h);
        self.dispatch(event);
    }

    /// Detach and remove every layer called `name`. Removed layers get no more
    /// viewport events or frames.
    pub fn remove_layer(&mut self, name: &str) -> usize {
        let before = self.layers.len();
        self.layers.retain_mut(|entry| {
            if entry.layer.name() != name {
                return true;
            }
            entry.layer.detach();
            false
        });
        before - self.layers.len()
    }

    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        self.layers
            .iter()
            .find(|e| e.layer.name() == name)
            .map(|e| e.layer.as_ref())
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|e| e.layer.name()).collect()
    }

    /// Run one animation tick and return the composed frame
    pub fn tick(&mut self) -> &PixelBuffer {
        self.poll_feed();

        for entry in &mut self.layers {
            entry.layer.tick(&self.viewport);
        }

        let (r, g, b) = self.config.background;
        self.frame.clear(r, g, b);
        self.composite(BlendMode::Alpha);
        self.draw_outline();
        self.composite(BlendMode::Additive);
        &self.frame
    }

    fn composite(&mut self, mode: BlendMode) {
        for entry in &self.layers {
            let layer = &entry.layer;
            if layer.is_visible() && layer.blend_mode() == mode {
                self.frame.composite(layer.surface(), mode);
            }
        }
    }

    fn draw_outline(&mut self) {
        let Some(geometry) = self.mask.geometry() else {
            return;
        };
        let (r, g, b) = self.config.outline;
        for polygon in geometry.polygons() {
            for ring in &polygon.rings {
                for (a, c) in ring.edges() {
                    let (x0, y0) = self.viewport.geo_to_pixel(a.lat, a.lon);
                    let (x1, y1) = self.viewport.geo_to_pixel(c.lat, c.lon);
                    self.frame.line(x0 as i32, y0 as i32, x1 as i32, y1 as i32, r, g, b);
                }
            }
        }
    }

    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mask(&self) -> &RegionMask {
        &self.mask
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Option<Rc<Snapshot>> {
        self.snapshot.get()
    }

    pub fn wind_field(&self) -> Option<Rc<WindField>> {
        self.wind.get()
    }
}
