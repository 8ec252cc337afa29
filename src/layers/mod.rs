//! Renderable layers
//!
//! Each layer owns a transparent surface the size of the viewport and repaints
//! it on its own schedule. The app composites visible surfaces onto the frame.

mod field;
mod particles;
mod wind_background;

pub use field::{render_blocks, FieldLayer};
pub use particles::ParticleLayer;
pub use wind_background::WindBackgroundLayer;

use crate::display::{BlendMode, PixelBuffer};
use crate::viewport::{Projection, ViewportEvent};

/// Trait for everything drawn over the base map
pub trait Layer {
    /// Layer name for UI/debugging
    fn name(&self) -> &str;

    /// Viewport notification. Only delivered while the layer is attached.
    fn on_viewport(&mut self, event: ViewportEvent, view: &dyn Projection);

    /// Advance one animation tick, repainting the surface if anything changed
    fn tick(&mut self, view: &dyn Projection);

    fn surface(&self) -> &PixelBuffer;

    /// How the surface goes onto the frame
    fn blend_mode(&self) -> BlendMode {
        BlendMode::Alpha
    }

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;

    fn show(&mut self) {
        self.set_visible(true);
    }

    fn hide(&mut self) {
        self.set_visible(false);
    }

    /// Cancel any pending frame. Called when the layer is removed.
    fn detach(&mut self);
}
