//! Decoded pixel storage and image dimensions.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};

/// Width and height of an image in pixels.
///
/// Ordered by width, then height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// The value a failed entry reports.
    pub const ZERO: Dimensions = Dimensions { width: 0, height: 0 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel area, the unit the cache budget is charged in.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A decoded image held in memory.
///
/// Pixels are stored row-major with a fixed number of interleaved 8-bit
/// channels per pixel. Each cache entry owns at most one buffer; it is
/// dropped when the entry is evicted, reloaded or destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw pixel data, returning `None` if the length does not match
    /// `width * height * channels` or `channels` is zero.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Option<Self> {
        if channels == 0 {
            return None;
        }
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(channels as usize)?;
        if data.len() != expected {
            return None;
        }
        Some(Self { width, height, channels, data })
    }

    /// Wraps RGBA8 pixel data.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::new(width, height, 4, data)
    }

    /// Allocates a zero-filled buffer.
    pub fn zeroed(width: u32, height: u32, channels: u8) -> Self {
        let channels = channels.max(1);
        let len = width as usize * height as usize * channels as usize;
        Self { width, height, channels, data: vec![0; len] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn area(&self) -> usize {
        self.dimensions().area()
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the channel values of the pixel at (`x`, `y`).
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y as usize * self.stride() + x as usize * self.channels as usize;
        self.data.get(start..start + self.channels as usize)
    }

    /// Returns one row of pixels.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        self.data.get(start..start + self.stride())
    }

    /// Returns a copy scaled to `width` x `height` with nearest-neighbour
    /// sampling, or `None` for an empty size or an unsupported channel count.
    pub fn resized(&self, width: u32, height: u32) -> Option<PixelBuffer> {
        if width == 0 || height == 0 || self.area() == 0 {
            return None;
        }
        let data = match self.channels {
            1 => self.resize_as::<Luma<u8>>(width, height)?,
            2 => self.resize_as::<LumaA<u8>>(width, height)?,
            3 => self.resize_as::<Rgb<u8>>(width, height)?,
            4 => self.resize_as::<Rgba<u8>>(width, height)?,
            _ => return None,
        };
        PixelBuffer::new(width, height, self.channels, data)
    }

    fn resize_as<P>(&self, width: u32, height: u32) -> Option<Vec<u8>>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let source = ImageBuffer::<P, &[u8]>::from_raw(self.width, self.height, &self.data[..])?;
        Some(imageops::resize(&source, width, height, FilterType::Nearest).into_raw())
    }

    /// Converts colour pixels to gray, keeping alpha. RGB becomes one
    /// channel and RGBA two; gray buffers are left alone.
    pub fn desaturate(&mut self) {
        if self.channels < 3 || self.data.is_empty() {
            return;
        }
        let channels = self.channels as usize;
        let has_alpha = channels > 3;
        let out_channels: u8 = if has_alpha { 2 } else { 1 };

        let mut out = Vec::with_capacity(self.area() * out_channels as usize);
        for px in self.data.chunks_exact(channels) {
            out.push(luminance(px[0], px[1], px[2]));
            if has_alpha {
                out.push(px[3]);
            }
        }
        self.data = out;
        self.channels = out_channels;
    }

    /// Blends every pixel with `color`. `weight` is the fraction of the
    /// original colour that is kept, clamped to `0.0..=1.0`. Alpha is untouched.
    pub fn color_average(&mut self, color: Rgb<u8>, weight: f32) {
        if self.data.is_empty() {
            return;
        }
        let keep = (256.0 * weight.clamp(0.0, 1.0)) as u32;
        let blend = 256 - keep;
        let [r, g, b] = color.0;
        let channels = self.channels as usize;

        if channels < 3 {
            let gray = luminance(r, g, b) as u32 * blend;
            for px in self.data.chunks_exact_mut(channels) {
                px[0] = ((px[0] as u32 * keep + gray) >> 8) as u8;
            }
        } else {
            let tint = [r as u32 * blend, g as u32 * blend, b as u32 * blend];
            for px in self.data.chunks_exact_mut(channels) {
                for (value, tint) in px[..3].iter_mut().zip(tint) {
                    *value = ((*value as u32 * keep + tint) >> 8) as u8;
                }
            }
        }
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((31 * r as u32 + 61 * g as u32 + 8 * b as u32) / 100) as u8
}

/// Edit applied to an entry's pixels.
///
/// Entries keep the edits they were given and replay them after every
/// decode, so an evicted image comes back the way it was left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelTransform {
    Desaturate,
    /// Blend with `color`, keeping `weight` of the original.
    ColorAverage { color: Rgb<u8>, weight: f32 },
}

impl PixelTransform {
    pub fn apply(&self, pixels: &mut PixelBuffer) {
        match *self {
            PixelTransform::Desaturate => pixels.desaturate(),
            PixelTransform::ColorAverage { color, weight } => pixels.color_average(color, weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area() {
        assert_eq!(Dimensions::new(10, 6).area(), 60);
        assert_eq!(Dimensions::ZERO.area(), 0);
        assert!(Dimensions::new(0, 5).is_empty());
        assert!(!Dimensions::new(1, 1).is_empty());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(PixelBuffer::new(2, 2, 4, vec![0; 15]).is_none());
        assert!(PixelBuffer::new(2, 2, 0, vec![]).is_none());
        assert!(PixelBuffer::new(2, 2, 3, vec![0; 12]).is_some());
    }

    #[test]
    fn test_pixel_access() {
        let data: Vec<u8> = (0..2 * 3 * 4).map(|v| v as u8).collect();
        let buffer = PixelBuffer::from_rgba8(2, 3, data).unwrap();

        assert_eq!(buffer.stride(), 8);
        assert_eq!(buffer.pixel(1, 0), Some(&[4u8, 5, 6, 7][..]));
        assert_eq!(buffer.pixel(0, 2), Some(&[16u8, 17, 18, 19][..]));
        assert_eq!(buffer.pixel(2, 0), None);
        assert_eq!(buffer.row(1).map(<[u8]>::len), Some(8));
        assert_eq!(buffer.row(3), None);
    }

    #[test]
    fn test_dimensions_order_by_width_then_height() {
        assert!(Dimensions::new(2, 9) < Dimensions::new(3, 1));
        assert!(Dimensions::new(3, 1) < Dimensions::new(3, 2));
    }

    #[test]
    fn test_resized() {
        let data = [10u8, 20, 30, 255].repeat(6);
        let buffer = PixelBuffer::from_rgba8(3, 2, data).unwrap();

        let bigger = buffer.resized(6, 5).unwrap();
        assert_eq!(bigger.dimensions(), Dimensions::new(6, 5));
        assert_eq!(bigger.channels(), 4);
        assert_eq!(bigger.pixel(5, 4), Some(&[10u8, 20, 30, 255][..]));

        let gray = PixelBuffer::new(4, 4, 1, vec![7; 16]).unwrap();
        let smaller = gray.resized(2, 1).unwrap();
        assert_eq!(smaller.data(), &[7, 7]);

        assert!(buffer.resized(0, 3).is_none());
    }

    #[test]
    fn test_desaturate() {
        let mut rgba = PixelBuffer::from_rgba8(1, 1, vec![100, 200, 50, 77]).unwrap();
        rgba.desaturate();
        assert_eq!(rgba.channels(), 2);
        assert_eq!(rgba.data(), &[157, 77]);
        assert_eq!(rgba.area(), 1);

        let mut rgb = PixelBuffer::new(2, 1, 3, vec![255, 255, 255, 0, 0, 0]).unwrap();
        rgb.desaturate();
        assert_eq!(rgb.channels(), 1);
        assert_eq!(rgb.data(), &[255, 0]);

        let mut gray = PixelBuffer::new(1, 1, 1, vec![42]).unwrap();
        gray.desaturate();
        assert_eq!(gray.data(), &[42]);
    }

    #[test]
    fn test_color_average() {
        let mut rgba = PixelBuffer::from_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap();
        rgba.color_average(Rgb([200, 100, 0]), 0.5);
        assert_eq!(rgba.data(), &[100, 50, 0, 255]);

        let mut kept = PixelBuffer::from_rgba8(1, 1, vec![9, 8, 7, 6]).unwrap();
        kept.color_average(Rgb([255, 255, 255]), 1.0);
        assert_eq!(kept.data(), &[9, 8, 7, 6]);

        let mut gray = PixelBuffer::new(1, 1, 1, vec![100]).unwrap();
        gray.color_average(Rgb([255, 255, 255]), 0.5);
        assert_eq!(gray.data(), &[177]);
    }

    #[test]
    fn test_transform_apply() {
        let mut buffer = PixelBuffer::from_rgba8(1, 1, vec![100, 200, 50, 77]).unwrap();
        PixelTransform::Desaturate.apply(&mut buffer);
        PixelTransform::ColorAverage { color: Rgb([0, 0, 0]), weight: 0.0 }.apply(&mut buffer);
        assert_eq!(buffer.data(), &[0, 77]);
    }

    #[test]
    fn test_zeroed() {
        let buffer = PixelBuffer::zeroed(4, 5, 3);
        assert_eq!(buffer.data().len(), 60);
        assert_eq!(buffer.area(), 20);
        assert_eq!(buffer.dimensions(), Dimensions::new(4, 5));
    }
}
