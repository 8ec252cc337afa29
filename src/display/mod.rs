//! Software frame buffer, plus the SDL2 window that shows it
//! (`display` feature).

mod pixel_buffer;
#[cfg(feature = "display")]
mod window;

pub use pixel_buffer::{BlendMode, PixelBuffer};
#[cfg(feature = "display")]
pub use window::{Display, InputEvent, RenderTarget};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
