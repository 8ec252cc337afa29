//! Block-sampled scalar field raster

use super::Layer;
use crate::color::{ColorScale, Rgba};
use crate::config::{Config, ScaleRange};
use crate::display::PixelBuffer;
use crate::interp::{interpolate_with, IdwParams};
use crate::observation::{Channel, Snapshot};
use crate::regions::RegionMask;
use crate::scheduler::{RedrawScheduler, Slot};
use crate::viewport::{Projection, ViewportEvent};
use std::rc::Rc;
use tracing::debug;

/// Repaint `surface` to cover `view` in `block_size` squares.
///
/// Each block takes the color of its center pixel's geocoordinate. Blocks
/// outside the mask, or where `color_at` has nothing, stay transparent.
/// Returns the number of blocks painted.
pub fn render_blocks(
    surface: &mut PixelBuffer,
    view: &dyn Projection,
    block_size: u32,
    mask: &RegionMask,
    mut color_at: impl FnMut(f64, f64) -> Option<Rgba>,
) -> usize {
    let (w, h) = view.size();
    surface.resize(w, h);
    surface.clear_rgba(0, 0, 0, 0);

    let step = block_size.max(1);
    let half = step as f32 * 0.5;
    let mut painted = 0;

    for by in (0..h).step_by(step as usize) {
        for bx in (0..w).step_by(step as usize) {
            let (lat, lon) = view.pixel_to_geo(bx as f32 + half, by as f32 + half);
            if !mask.inside_region(lat, lon) {
                continue;
            }
            let Some(color) = color_at(lat, lon).filter(|c| !c.is_transparent()) else {
                continue;
            };
            let (r, g, b) = color.rgb();
            surface.fill_rect_rgba(bx as i32, by as i32, step, step, r, g, b, color.alpha_u8());
            painted += 1;
        }
    }

    painted
}

/// Interpolated, masked, colored raster of one scalar channel
pub struct FieldLayer {
    channel: Channel,
    scale: &'static ColorScale,
    range: ScaleRange,
    block_size: u32,
    idw: IdwParams,
    mask: Rc<RegionMask>,
    snapshot: Slot<Snapshot>,
    seen_generation: u64,
    surface: PixelBuffer,
    scheduler: RedrawScheduler,
    visible: bool,
    paints: u64,
}

impl FieldLayer {
    pub fn new(
        channel: Channel,
        config: &Config,
        mask: Rc<RegionMask>,
        snapshot: Slot<Snapshot>,
    ) -> Self {
        let mut scheduler = RedrawScheduler::new();
        scheduler.request();
        Self {
            channel,
            scale: ColorScale::for_channel(channel),
            range: config.ranges.for_channel(channel),
            block_size: config.block_size,
            idw: config.idw(),
            mask,
            seen_generation: snapshot.generation(),
            snapshot,
            surface: PixelBuffer::with_size(1, 1),
            scheduler,
            visible: false,
            paints: 0,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Completed repaints since creation
    pub fn paints(&self) -> u64 {
        self.paints
    }

    /// Interpolated value under (lat, lon), None outside the region or without data
    pub fn value_at(&self, lat: f64, lon: f64) -> Option<f64> {
        if !self.mask.inside_region(lat, lon) {
            return None;
        }
        let snapshot = self.snapshot.get()?;
        interpolate_with(lat, lon, &snapshot.cells, self.channel, &self.idw)
    }

    fn paint(&mut self, view: &dyn Projection) {
        let snapshot = self.snapshot.get();
        let cells = snapshot.as_deref().map_or(&[][..], |s| &s.cells[..]);
        let (channel, idw, range, scale) = (self.channel, self.idw, self.range, self.scale);

        let size = self.block_size;
        let blocks = render_blocks(&mut self.surface, view, size, &self.mask, |lat, lon| {
            let value = interpolate_with(lat, lon, cells, channel, &idw)?;
            Some(scale.color_for(range.normalize(value)))
        });

        self.paints += 1;
        debug!(layer = channel.name(), blocks, "field repainted");
    }
}

impl Layer for FieldLayer {
    fn name(&self) -> &str {
        self.channel.name()
    }

    fn on_viewport(&mut self, _event: ViewportEvent, _view: &dyn Projection) {
        self.scheduler.request();
    }

    fn tick(&mut self, view: &dyn Projection) {
        let generation = self.snapshot.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.scheduler.request();
        }
        // Requests made while hidden stay pending until shown
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
    use crate::regions::{Polygon, RegionGeometry, Ring};
    use crate::viewport::Viewport;

    fn square_mask() -> Rc<RegionMask> {
        let ring = Ring::from_lon_lat(&[
            [100.0, 10.0],
            [110.0, 10.0],
            [110.0, 20.0],
            [100.0, 20.0],
        ]);
        Rc::new(RegionMask::new(RegionGeometry::Polygon(Polygon::new(vec![ring]))))
    }

    fn warm_snapshot() -> Snapshot {
        Snapshot::new(vec![
            ObservationCell::new("a", 12.0, 102.0).with_temp(24.0),
            ObservationCell::new("b", 18.0, 108.0).with_temp(30.0),
        ])
    }

    // Twice as wide as the region: the right half lies outside it
    fn view() -> Viewport {
        Viewport::new(120, 60, 15.0, 110.0, 6.0)
    }

    fn layer(slot: &Slot<Snapshot>) -> FieldLayer {
        let config = Config::default();
        let mut layer = FieldLayer::new(Channel::Temperature, &config, square_mask(), slot.clone());
        layer.show();
        layer
    }

    #[test]
    fn test_paints_inside_region_only() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let mut layer = layer(&slot);
        let vp = view();
        layer.tick(&vp);

        let s = layer.surface();
        assert_eq!((s.width(), s.height()), (120, 60));
        assert!(s.get_pixel_rgba(20, 30).is_some_and(|(_, _, _, a)| a > 0));
        assert_eq!(s.get_pixel_rgba(100, 30).map(|p| p.3), Some(0));
    }

    #[test]
    fn test_blocks_are_uniform() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let mut layer = layer(&slot);
        layer.tick(&view());

        let s = layer.surface();
        let first = s.get_pixel_rgba(12, 12);
        for y in 12..18 {
            for x in 12..18 {
                assert_eq!(s.get_pixel_rgba(x, y), first);
            }
        }
    }

    #[test]
    fn test_triggers_coalesce_into_one_paint() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let mut layer = layer(&slot);
        let vp = view();

        layer.tick(&vp);
        assert_eq!(layer.paints(), 1);

        layer.on_viewport(ViewportEvent::Changed, &vp);
        layer.on_viewport(ViewportEvent::Changed, &vp);
        slot.set(warm_snapshot());
        layer.tick(&vp);
        assert_eq!(layer.paints(), 2);

        layer.tick(&vp);
        assert_eq!(layer.paints(), 2);
    }

    #[test]
    fn test_cleared_snapshot_paints_nothing() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let mut layer = layer(&slot);
        let vp = view();
        layer.tick(&vp);
        assert!(layer.surface().coverage() > 0);

        slot.clear();
        layer.tick(&vp);
        assert_eq!(layer.surface().coverage(), 0);
        assert_eq!(layer.value_at(15.0, 105.0), None);
    }

    #[test]
    fn test_hidden_layer_defers_paint() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let mut layer = layer(&slot);
        layer.hide();
        let vp = view();
        layer.tick(&vp);
        assert_eq!(layer.paints(), 0);

        layer.show();
        layer.tick(&vp);
        assert_eq!(layer.paints(), 1);
    }

    #[test]
    fn test_detached_layer_stops_painting() {
        let slot = Slot::new();
        let mut layer = layer(&slot);
        layer.detach();
        slot.set(warm_snapshot());
        layer.show();
        layer.tick(&view());
        assert_eq!(layer.paints(), 0);
    }

    #[test]
    fn test_value_at_masks_outside_region() {
        let slot = Slot::new();
        slot.set(warm_snapshot());
        let layer = layer(&slot);
        assert_eq!(layer.value_at(12.0, 102.0), Some(24.0));
        assert_eq!(layer.value_at(40.0, 40.0), None);
    }
}
