//! Wind speed shading under the particle trails

use super::{render_blocks, Layer};
use crate::color::{ColorScale, WIND_SPEED};
use crate::config::{Config, ScaleRange};
use crate::display::PixelBuffer;
use crate::regions::RegionMask;
use crate::scheduler::{RedrawScheduler, Slot};
use crate::viewport::{Projection, ViewportEvent};
use crate::wind::WindField;
use std::rc::Rc;
use tracing::debug;

pub struct WindBackgroundLayer {
    scale: &'static ColorScale,
    range: ScaleRange,
    block_size: u32,
    mask: Rc<RegionMask>,
    field: Slot<WindField>,
    seen_generation: u64,
    surface: PixelBuffer,
    scheduler: RedrawScheduler,
    visible: bool,
}

impl WindBackgroundLayer {
    pub fn new(config: &Config, mask: Rc<RegionMask>, field: Slot<WindField>) -> Self {
        let mut scheduler = RedrawScheduler::new();
        scheduler.request();
        Self {
            scale: &WIND_SPEED,
            range: config.ranges.wind,
            // Wind shading is soft; twice the block size keeps it cheap
            block_size: config.block_size * 2,
            mask,
            seen_generation: field.generation(),
            field,
            surface: PixelBuffer::with_size(1, 1),
            scheduler,
            visible: false,
        }
    }

    fn paint(&mut self, view: &dyn Projection) {
        let field = self.field.get();
        let (range, scale) = (self.range, self.scale);
        let size = self.block_size;
        let blocks = render_blocks(&mut self.surface, view, size, &self.mask, |lat, lon| {
            let sample = field.as_deref()?.sample(lat, lon)?;
            Some(scale.color_for(range.normalize(sample.s)))
        });
        debug!(blocks, "wind background repainted");
    }
}

impl Layer for WindBackgroundLayer {
    fn name(&self) -> &str {
        "wind background"
    }

    fn on_viewport(&mut self, _event: ViewportEvent, _view: &dyn Projection) {
        self.scheduler.request();
    }

    fn tick(&mut self, view: &dyn Projection) {
        let generation = self.field.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.scheduler.request();
        }
        if self.visible && self.scheduler.take() {
            self.paint(view);
        }
    }

    fn surface(&self) -> &PixelBuffer {
        &self.surface
    }

    fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.scheduler.request();
        }
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn detach(&mut self) {
        self.scheduler.cancel();
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationCell;
    use crate::viewport::Viewport;

    #[test]
    fn test_shades_only_with_field() {
        let slot = Slot::new();
        let mask = Rc::new(RegionMask::empty());
        let mut layer = WindBackgroundLayer::new(&Config::default(), mask, slot.clone());
        layer.show();
        let vp = Viewport::new(48, 48, 15.0, 105.0, 4.0);

        layer.tick(&vp);
        assert_eq!(layer.surface().coverage(), 0);

        slot.set(WindField::build(&[
            ObservationCell::new("a", 15.0, 105.0).with_wind(12.0, 90.0),
        ]));
        layer.tick(&vp);
        // No geometry loaded: the mask fails open and every block is shaded
        assert_eq!(layer.surface().coverage(), 48 * 48);
    }
}
