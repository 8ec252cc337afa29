//! Wind particle trails
//!
//! The trail surface is never cleared between ticks. Its alpha is faded, then
//! this tick's segments are added on top, so motion leaves fading streaks.

use super::Layer;
use crate::config::Config;
use crate::display::{BlendMode, PixelBuffer};
use crate::particles::{ParticleSystem, SpawnArea};
use crate::regions::RegionMask;
use crate::scheduler::{RedrawScheduler, Slot};
use crate::util::Rng;
use crate::viewport::{Projection, ViewportEvent};
use crate::wind::WindField;
use std::rc::Rc;
use tracing::debug;

const SEGMENT_ALPHA: u8 = 230;

pub struct ParticleLayer {
    system: ParticleSystem,
    mask: Rc<RegionMask>,
    field: Slot<WindField>,
    rng: Rng,
    trails: PixelBuffer,
    trail_fade: f32,
    trail_color: (u8, u8, u8),
    /// Next animation frame
    scheduler: RedrawScheduler,
    visible: bool,
    panning: bool,
    needs_seed: bool,
    segments: usize,
}

impl ParticleLayer {
    pub fn new(config: &Config, mask: Rc<RegionMask>, field: Slot<WindField>) -> Self {
        let p = &config.particles;
        Self {
            system: ParticleSystem::new(p.count, p.advection()),
            mask,
            field,
            rng: Rng::new(p.seed),
            trails: PixelBuffer::with_size(1, 1),
            trail_fade: p.trail_fade,
            trail_color: p.trail_color,
            scheduler: RedrawScheduler::new(),
            visible: false,
            panning: false,
            needs_seed: true,
            segments: 0,
        }
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut ParticleSystem {
        &mut self.system
    }

    /// Trail segments drawn on the last animated tick
    pub fn segments_last_tick(&self) -> usize {
        self.segments
    }

    fn clear_trails(&mut self) {
        self.trails.clear_rgba(0, 0, 0, 0);
    }

    fn animate(&mut self, view: &dyn Projection) {
        let (w, h) = view.size();
        self.trails.resize(w, h);

        let area = SpawnArea::new(&self.mask, view.geo_bounds());
        if self.needs_seed {
            self.system.seed(&area, &mut self.rng);
            self.needs_seed = false;
            self.trails.clear_rgba(0, 0, 0, 0);
            debug!(count = self.system.count(), "particles seeded");
        }

        self.trails.fade_alpha(self.trail_fade);

        let field = self.field.get();
        let trails = &mut self.trails;
        let (r, g, b) = self.trail_color;
        let mut segments = 0;

        self.system.advance(&area, field.as_deref(), &mut self.rng, |(lat0, lon0), p, _| {
            if p.just_respawned() {
                return;
            }
            let (x0, y0) = view.geo_to_pixel(lat0, lon0);
            let (x1, y1) = view.geo_to_pixel(p.lat, p.lon);
            if !view.contains_pixel(x0, y0) || !view.contains_pixel(x1, y1) {
                return;
            }
            let (x0, y0, x1, y1) = (x0 as i32, y0 as i32, x1 as i32, y1 as i32);
            trails.line_additive(x0, y0, x1, y1, r, g, b, SEGMENT_ALPHA);
            segments += 1;
        });

        self.segments = segments;
    }
}

impl Layer for ParticleLayer {
    fn name(&self) -> &str {
        "wind particles"
    }

    fn on_viewport(&mut self, event: ViewportEvent, _view: &dyn Projection) {
        match event {
            ViewportEvent::PanStart => {
                self.panning = true;
                self.clear_trails();
            },
            ViewportEvent::PanEnd => {
                self.panning = false;
                self.needs_seed = true;
                self.scheduler.request();
            },
            // Pan steps only move the view; zoom and resize invalidate every trail
            ViewportEvent::Changed if self.panning => {},
            ViewportEvent::Changed => {
                self.clear_trails();
                self.needs_seed = true;
            },
        }
    }

    fn tick(&mut self, view: &dyn Projection) {
        if !self.scheduler.take() {
            return;
        }
        // Frozen while dragging; the next frame stays booked
        if !self.visible || self.panning {
            self.scheduler.request();
            return;
        }
        self.animate(view);
        self.scheduler.request();
    }

    fn surface(&self) -> &PixelBuffer {
        &self.trails
    }

    fn blend_mode(&self) -> BlendMode {
        BlendMode::Additive
    }

    fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.needs_seed = true;
            self.scheduler.request();
        }
        if !visible {
            self.clear_trails();
        }
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn detach(&mut self) {
        self.scheduler.cancel();
        self.visible = false;
        self.clear_trails();
    }
}
