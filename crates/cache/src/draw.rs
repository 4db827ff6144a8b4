//! Geometry and the platform blit contract.

use crate::pixels::PixelBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Destination rectangle in target coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Copies decoded pixels to a drawing surface.
///
/// Called by [`SharedImageCache::draw`](crate::SharedImageCache::draw) while
/// the cache is locked, so implementations must not call back into the same
/// cache.
pub trait Blitter {
    /// Draws `pixels` into `dest`, starting at `src` within the image.
    fn draw_pixels(&mut self, pixels: &PixelBuffer, dest: Rect, src: Point);
}

impl<F> Blitter for F
where
    F: FnMut(&PixelBuffer, Rect, Point),
{
    fn draw_pixels(&mut self, pixels: &PixelBuffer, dest: Rect, src: Point) {
        self(pixels, dest, src)
    }
}

/// Blitter that only counts the pixels it was asked to draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingBlitter {
    pub draws: usize,
    pub pixels: u64,
}

impl Blitter for CountingBlitter {
    fn draw_pixels(&mut self, pixels: &PixelBuffer, dest: Rect, src: Point) {
        let visible_w = pixels.width().saturating_sub(src.x.max(0) as u32).min(dest.width);
        let visible_h = pixels.height().saturating_sub(src.y.max(0) as u32).min(dest.height);
        self.draws += 1;
        self.pixels += visible_w as u64 * visible_h as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_blitter_clips_to_source() {
        let buffer = PixelBuffer::zeroed(10, 8, 4);
        let mut blitter = CountingBlitter::default();

        blitter.draw_pixels(&buffer, Rect::new(0, 0, 100, 100), Point::new(2, 3));
        assert_eq!(blitter.draws, 1);
        assert_eq!(blitter.pixels, 8 * 5);

        blitter.draw_pixels(&buffer, Rect::new(5, 5, 4, 4), Point::ORIGIN);
        assert_eq!(blitter.draws, 2);
        assert_eq!(blitter.pixels, 40 + 16);
    }

    #[test]
    fn test_closure_blitter() {
        let buffer = PixelBuffer::zeroed(3, 3, 4);
        let mut seen = Vec::new();
        let mut blitter = |pixels: &PixelBuffer, dest: Rect, _src: Point| {
            seen.push((pixels.area(), dest));
        };
        blitter.draw_pixels(&buffer, Rect::new(1, 2, 3, 3), Point::ORIGIN);
        assert_eq!(seen, vec![(9, Rect::new(1, 2, 3, 3))]);
    }

    #[test]
    fn test_empty_rect() {
        assert!(Rect::new(0, 0, 0, 5).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }
}
