// ============================================================================
// Blend Mode
// ============================================================================

/// Compositing blend mode for `composite()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Standard source-over alpha blending
    Alpha,
    /// Additive: dst += src * (src_alpha / 255), saturating
    Additive,
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], r: u8, g: u8, b: u8) {
    dest[0] = 255; // A
    dest[1] = b; // B
    dest[2] = g; // G
    dest[3] = r; // R
}

/// Write ABGR pixel with custom alpha (for layer surfaces used with `composite`)
#[inline]
fn write_pixel_rgba(dest: &mut [u8], r: u8, g: u8, b: u8, a: u8) {
    dest[0] = a; // A
    dest[1] = b; // B
    dest[2] = g; // G
    dest[3] = r; // R
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 pixel buffer for software rendering.
/// The frame and every layer surface are one of these.
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a fully transparent buffer with custom resolution
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; (width * height * 4) as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate to a new size; contents become transparent
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        *self = Self::with_size(width, height);
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Clear to a solid opaque color
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        self.clear_rgba(r, g, b, 255);
    }

    /// Clear to a color with custom alpha. `clear_rgba(0, 0, 0, 0)` empties a surface.
    /// Uses u32 fill for speed.
    pub fn clear_rgba(&mut self, r: u8, g: u8, b: u8, a: u8) {
        let pixel = u32::from_ne_bytes([a, b, g, r]);
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;
        for i in 0..len {
            // Safety: pixels.len() is width * height * 4, so i < len stays in
            // bounds; write_unaligned makes no alignment assumption about Vec<u8>.
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set a single pixel with custom alpha (bounds checked)
    #[inline]
    pub fn set_pixel_rgba(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel_rgba(&mut self.pixels[idx..idx + 4], r, g, b, a);
        }
    }

    /// Read all 4 channels of a pixel (bounds checked)
    /// Returns (r, g, b, a) or None if out of bounds
    #[inline]
    pub fn get_pixel_rgba(&self, x: i32, y: i32) -> Option<(u8, u8, u8, u8)> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some((
                self.pixels[idx + 3], // R
                self.pixels[idx + 2], // G
                self.pixels[idx + 1], // B
                self.pixels[idx],     // A
            ))
        } else {
            None
        }
    }

    /// Saturating add of all four channels ("lighter" compositing)
    #[inline]
    fn add_pixel_rgba(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8, a: u8) {
        let idx = self.pixel_index(x, y);
        let px = &mut self.pixels[idx..idx + 4];
        px[0] = px[0].saturating_add(a);
        px[1] = px[1].saturating_add(b);
        px[2] = px[2].saturating_add(g);
        px[3] = px[3].saturating_add(r);
    }

    /// Fill a horizontal span with an RGBA value (overwrites, no blending)
    fn hline_rgba(&mut self, x1: i32, x2: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }

        let mut idx = self.pixel_index(start as u32, y as u32);
        let count = (end - start + 1) as usize;
        for _ in 0..count {
            write_pixel_rgba(&mut self.pixels[idx..idx + 4], r, g, b, a);
            idx += 4;
        }
    }

    /// Fill a rectangle with an RGBA value, clipped to the buffer
    pub fn fill_rect_rgba(
        &mut self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        for row in 0..h as i32 {
            self.hline_rgba(x, x + w as i32 - 1, y + row, r, g, b, a);
        }
    }

    /// Draw a line using Bresenham's algorithm with Cohen-Sutherland clipping
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, r: u8, g: u8, b: u8) {
        self.walk_line(x0, y0, x1, y1, |buf, x, y| {
            let idx = buf.pixel_index(x, y);
            write_pixel(&mut buf.pixels[idx..idx + 4], r, g, b);
        });
    }

    /// Line drawn with saturating addition of color and alpha
    pub fn line_additive(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        self.walk_line(x0, y0, x1, y1, |buf, x, y| {
            buf.add_pixel_rgba(x, y, r, g, b, a);
        });
    }

    /// Clip, then visit every Bresenham pixel. `plot` only sees in-bounds coordinates.
    fn walk_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        mut plot: impl FnMut(&mut Self, u32, u32),
    ) {
        let Some((cx0, cy0, cx1, cy1)) = self.clip_line(x0, y0, x1, y1) else {
            return;
        };

        let dx = (cx1 - cx0).abs();
        let dy = -((cy1 - cy0).abs());
        let sx = if cx0 < cx1 { 1i32 } else { -1i32 };
        let sy = if cy0 < cy1 { 1i32 } else { -1i32 };
        let mut err = dx + dy;
        let mut x = cx0;
        let mut y = cy0;

        loop {
            plot(self, x as u32, y as u32);
            if x == cx1 && y == cy1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Cohen-Sutherland line clipping algorithm
    /// Returns the clipped endpoints, or None when nothing is visible
    fn clip_line(
        &self,
        mut x0: i32,
        mut y0: i32,
        mut x1: i32,
        mut y1: i32,
    ) -> Option<(i32, i32, i32, i32)> {
        const INSIDE: u8 = 0;
        const LEFT: u8 = 1;
        const RIGHT: u8 = 2;
        const BOTTOM: u8 = 4;
        const TOP: u8 = 8;
        // Converges in at most 4 iterations for valid input
        const MAX_ITERATIONS: u32 = 16;

        let w = self.width as i32;
        let h = self.height as i32;
        if w == 0 || h == 0 {
            return None;
        }

        let outcode = |x: i32, y: i32| -> u8 {
            let mut code = INSIDE;
            if x < 0 {
                code |= LEFT;
            } else if x >= w {
                code |= RIGHT;
            }
            if y < 0 {
                code |= TOP;
            } else if y >= h {
                code |= BOTTOM;
            }
            code
        };

        let mut code0 = outcode(x0, y0);
        let mut code1 = outcode(x1, y1);

        for _ in 0..MAX_ITERATIONS {
            if (code0 | code1) == 0 {
                return Some((x0, y0, x1, y1));
            }
            if (code0 & code1) != 0 {
                return None;
            }

            let code_out = if code0 != 0 { code0 } else { code1 };
            let (x, y);

            // i64 so long off-screen segments can't overflow the products
            let dy = i64::from(y1 - y0);
            let dx = i64::from(x1 - x0);
            let (fx0, fy0) = (i64::from(x0), i64::from(y0));

            if (code_out & BOTTOM) != 0 {
                if dy == 0 {
                    return None;
                }
                x = (fx0 + dx * (i64::from(h - 1) - fy0) / dy) as i32;
                y = h - 1;
            } else if (code_out & TOP) != 0 {
                if dy == 0 {
                    return None;
                }
                x = (fx0 + dx * (-fy0) / dy) as i32;
                y = 0;
            } else if (code_out & RIGHT) != 0 {
                if dx == 0 {
                    return None;
                }
                y = (fy0 + dy * (i64::from(w - 1) - fx0) / dx) as i32;
                x = w - 1;
            } else {
                // LEFT
                if dx == 0 {
                    return None;
                }
                y = (fy0 + dy * (-fx0) / dx) as i32;
                x = 0;
            }

            if code_out == code0 {
                x0 = x;
                y0 = y;
                code0 = outcode(x0, y0);
            } else {
                x1 = x;
                y1 = y;
                code1 = outcode(x1, y1);
            }
        }

        None
    }

    // ========================================================================
    // Buffer Operations
    // ========================================================================

    /// Composite a same-origin source buffer onto this one using per-pixel
    /// source alpha. Pixels beyond either buffer are skipped. Fully transparent
    /// source pixels are skipped; fully opaque ones are copied in Alpha mode.
    pub fn composite(&mut self, src: &PixelBuffer, mode: BlendMode) {
        let w = src.width.min(self.width);
        let h = src.height.min(self.height);

        for y in 0..h {
            for x in 0..w {
                let si = src.pixel_index(x, y);
                let sa = src.pixels[si]; // alpha channel (ABGR[0])
                if sa == 0 {
                    continue;
                }

                let sr = src.pixels[si + 3];
                let sg = src.pixels[si + 2];
                let sb = src.pixels[si + 1];

                let di = self.pixel_index(x, y);

                match mode {
                    BlendMode::Alpha => {
                        if sa == 255 {
                            write_pixel(&mut self.pixels[di..di + 4], sr, sg, sb);
                        } else {
                            let alpha = sa as u16;
                            self.pixels[di] = 255;
                            self.pixels[di + 1] = blend_channel(sb, self.pixels[di + 1], alpha);
                            self.pixels[di + 2] = blend_channel(sg, self.pixels[di + 2], alpha);
                            self.pixels[di + 3] = blend_channel(sr, self.pixels[di + 3], alpha);
                        }
                    },
                    BlendMode::Additive => {
                        let a = sa as u16;
                        let add_r = ((sr as u16 * a + 127) / 255) as u8;
                        let add_g = ((sg as u16 * a + 127) / 255) as u8;
                        let add_b = ((sb as u16 * a + 127) / 255) as u8;
                        self.pixels[di + 1] = self.pixels[di + 1].saturating_add(add_b);
                        self.pixels[di + 2] = self.pixels[di + 2].saturating_add(add_g);
                        self.pixels[di + 3] = self.pixels[di + 3].saturating_add(add_r);
                    },
                }
            }
        }
    }

    /// Multiply the alpha channel by `factor`, leaving color alone.
    /// factor: 0.0 = fully transparent, 1.0 = unchanged
    pub fn fade_alpha(&mut self, factor: f32) {
        let factor_u16 = (factor.clamp(0.0, 1.0) * 256.0) as u16;
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk[0] = ((chunk[0] as u16 * factor_u16) >> 8) as u8;
        }
    }

    /// Number of pixels with non-zero alpha
    pub fn coverage(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[0] != 0).count()
    }

    /// Raw bytes for SDL texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_transparent() {
        let buf = PixelBuffer::with_size(8, 4);
        assert_eq!(buf.coverage(), 0);
        assert_eq!(buf.get_pixel_rgba(7, 3), Some((0, 0, 0, 0)));
        assert_eq!(buf.get_pixel_rgba(8, 0), None);
    }

    #[test]
    fn test_fill_rect_rgba_clips() {
        let mut buf = PixelBuffer::with_size(10, 10);
        buf.fill_rect_rgba(7, 7, 6, 6, 10, 20, 30, 128);
        assert_eq!(buf.coverage(), 9);
        assert_eq!(buf.get_pixel_rgba(9, 9), Some((10, 20, 30, 128)));
        buf.fill_rect_rgba(-20, -20, 5, 5, 1, 1, 1, 1);
        assert_eq!(buf.coverage(), 9);
    }

    #[test]
    fn test_line_clipped_off_screen() {
        let mut buf = PixelBuffer::with_size(16, 16);
        buf.line(-100, -100, -50, -50, 255, 255, 255);
        assert_eq!(buf.coverage(), 0);
        buf.line(-10, 5, 100, 5, 255, 255, 255);
        assert_eq!(buf.coverage(), 16);
        assert_eq!(buf.get_pixel_rgba(0, 5), Some((255, 255, 255, 255)));
    }

    #[test]
    fn test_line_additive_saturates() {
        let mut buf = PixelBuffer::with_size(4, 4);
        buf.line_additive(0, 0, 3, 0, 200, 10, 0, 200);
        buf.line_additive(0, 0, 3, 0, 200, 10, 0, 200);
        assert_eq!(buf.get_pixel_rgba(2, 0), Some((255, 20, 0, 255)));
    }

    #[test]
    fn test_fade_alpha_only() {
        let mut buf = PixelBuffer::with_size(2, 1);
        buf.set_pixel_rgba(0, 0, 100, 100, 100, 200);
        buf.fade_alpha(0.5);
        assert_eq!(buf.get_pixel_rgba(0, 0), Some((100, 100, 100, 100)));
        for _ in 0..400 {
            buf.fade_alpha(0.97);
        }
        assert_eq!(buf.coverage(), 0);
    }

    #[test]
    fn test_composite_alpha_and_additive() {
        let mut dst = PixelBuffer::with_size(2, 1);
        dst.clear(0, 0, 0);

        let mut src = PixelBuffer::with_size(2, 1);
        src.set_pixel_rgba(0, 0, 255, 0, 0, 255);
        src.set_pixel_rgba(1, 0, 0, 0, 255, 128);
        dst.composite(&src, BlendMode::Alpha);
        assert_eq!(dst.get_pixel_rgba(0, 0), Some((255, 0, 0, 255)));
        let (_, _, b, a) = dst.get_pixel_rgba(1, 0).unwrap();
        assert!((127..=129).contains(&b));
        assert_eq!(a, 255);

        dst.composite(&src, BlendMode::Additive);
        assert_eq!(dst.get_pixel_rgba(0, 0), Some((255, 0, 0, 255)));
        let (_, _, b2, _) = dst.get_pixel_rgba(1, 0).unwrap();
        assert!(b2 > b);
    }

    #[test]
    fn test_composite_skips_pixels_beyond_destination() {
        let mut dst = PixelBuffer::with_size(2, 2);
        dst.clear(0, 0, 0);
        let mut src = PixelBuffer::with_size(4, 1);
        src.clear_rgba(0, 255, 0, 255);
        dst.composite(&src, BlendMode::Alpha);
        assert_eq!(dst.get_pixel_rgba(1, 0), Some((0, 255, 0, 255)));
        assert_eq!(dst.get_pixel_rgba(0, 1), Some((0, 0, 0, 255)));
    }
}
