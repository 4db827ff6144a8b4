//! Built-in decoders.
//!
//! Signature checks are done here; the byte-level decoding is delegated to
//! the `image` crate. Every decoder produces RGBA8 pixels.

use image::{ImageFormat, ImageReader};

use crate::decoder::ImageDecoder;
use crate::error::DecodeError;
use crate::pixels::{Dimensions, PixelBuffer};
use crate::source::ImageSource;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// `"BM"`
pub fn is_bmp(header: &[u8]) -> bool {
    header.starts_with(b"BM")
}

/// `"GIF87a"` or `"GIF89a"`
pub fn is_gif(header: &[u8]) -> bool {
    header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a")
}

pub fn is_png(header: &[u8]) -> bool {
    header.starts_with(&PNG_SIGNATURE)
}

/// JPEG start-of-image marker followed by another marker.
pub fn is_jpeg(header: &[u8]) -> bool {
    header.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// `P1` through `P7` followed by whitespace.
pub fn is_pnm(header: &[u8]) -> bool {
    match header {
        [b'P', kind, sep, ..] => (b'1'..=b'7').contains(kind) && sep.is_ascii_whitespace(),
        _ => false,
    }
}

/// Decoder for a format supported by the `image` crate.
#[derive(Clone, Copy)]
pub struct CodecDecoder {
    name: &'static str,
    format: ImageFormat,
    predicate: fn(&[u8]) -> bool,
}

impl CodecDecoder {
    pub const fn new(name: &'static str, format: ImageFormat, predicate: fn(&[u8]) -> bool) -> Self {
        Self { name, format, predicate }
    }

    pub const fn bmp() -> Self {
        Self::new("bmp", ImageFormat::Bmp, is_bmp)
    }

    pub const fn gif() -> Self {
        Self::new("gif", ImageFormat::Gif, is_gif)
    }

    pub const fn png() -> Self {
        Self::new("png", ImageFormat::Png, is_png)
    }

    pub const fn jpeg() -> Self {
        Self::new("jpeg", ImageFormat::Jpeg, is_jpeg)
    }

    pub const fn pnm() -> Self {
        Self::new("pnm", ImageFormat::Pnm, is_pnm)
    }

    /// All built-in decoders in registration order.
    pub fn builtin() -> [CodecDecoder; 5] {
        [Self::bmp(), Self::gif(), Self::png(), Self::jpeg(), Self::pnm()]
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

impl std::fmt::Debug for CodecDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecDecoder")
            .field("name", &self.name)
            .field("format", &self.format)
            .finish()
    }
}

impl ImageDecoder for CodecDecoder {
    fn name(&self) -> &str {
        self.name
    }

    fn probe(&self, header: &[u8]) -> bool {
        (self.predicate)(header)
    }

    fn measure(&self, source: &ImageSource<'_>) -> Result<Dimensions, DecodeError> {
        let reader = ImageReader::with_format(source.open()?, self.format);
        let (width, height) = reader.into_dimensions()?;
        Ok(Dimensions::new(width, height))
    }

    fn decode(&self, source: &ImageSource<'_>) -> Result<PixelBuffer, DecodeError> {
        let reader = ImageReader::with_format(source.open()?, self.format);
        let rgba = reader.decode()?.into_rgba8();
        let (width, height) = rgba.dimensions();

        PixelBuffer::from_rgba8(width, height, rgba.into_raw()).ok_or_else(|| {
            DecodeError::InvalidDimensions { name: source.name().to_string(), width, height }
        })
    }
}

/// Sentinel for data no registered decoder recognises. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDecoder;

impl UnknownDecoder {
    pub const NAME: &'static str = "unknown";
}

impl ImageDecoder for UnknownDecoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn probe(&self, _header: &[u8]) -> bool {
        false
    }

    fn measure(&self, source: &ImageSource<'_>) -> Result<Dimensions, DecodeError> {
        Err(DecodeError::UnknownFormat { name: source.name().to_string() })
    }

    fn decode(&self, source: &ImageSource<'_>) -> Result<PixelBuffer, DecodeError> {
        Err(DecodeError::UnknownFormat { name: source.name().to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Encodes a `width` x `height` test image in `format`.
    pub(crate) fn encode(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let image = match format {
            // JPEG and PNM encoders reject an alpha channel
            ImageFormat::Jpeg | ImageFormat::Pnm => DynamicImage::ImageRgb8(RgbImage::from_fn(
                width,
                height,
                |x, y| Rgb([x as u8, y as u8, 200]),
            )),
            _ => DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                Rgba([x as u8, y as u8, 50, 255])
            })),
        };
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).expect("test image should encode");
        bytes
    }

    #[test]
    fn test_predicates_accept_signatures() {
        assert!(is_bmp(b"BM\x00\x00"));
        assert!(is_gif(b"GIF89a"));
        assert!(is_gif(b"GIF87a\x01"));
        assert!(is_png(&PNG_SIGNATURE));
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(is_pnm(b"P6\n3 2\n255\n"));
    }

    #[test]
    fn test_predicates_reject_short_buffers() {
        assert!(!is_bmp(b"B"));
        assert!(!is_gif(b"GIF8"));
        assert!(!is_png(&PNG_SIGNATURE[..7]));
        assert!(!is_jpeg(&[0xFF, 0xD8]));
        assert!(!is_pnm(b"P6"));
        assert!(!is_pnm(b""));
    }

    #[test]
    fn test_predicates_reject_lookalikes() {
        assert!(!is_pnm(b"P8 "));
        assert!(!is_pnm(b"P6x"));
        assert!(!is_gif(b"GIF90a"));
        assert!(!is_bmp(b"bm"));
    }

    #[test]
    fn test_each_builtin_measures_and_decodes() {
        let cases = [
            (CodecDecoder::bmp(), ImageFormat::Bmp),
            (CodecDecoder::gif(), ImageFormat::Gif),
            (CodecDecoder::png(), ImageFormat::Png),
            (CodecDecoder::jpeg(), ImageFormat::Jpeg),
            (CodecDecoder::pnm(), ImageFormat::Pnm),
        ];

        for (decoder, format) in cases {
            let bytes = encode(format, 7, 5);
            assert!(decoder.probe(&bytes), "{} should recognise its own output", decoder.name());

            let source = ImageSource::from_bytes("test", &bytes);
            assert_eq!(decoder.measure(&source).unwrap(), Dimensions::new(7, 5));

            let pixels = decoder.decode(&source).unwrap();
            assert_eq!(pixels.dimensions(), Dimensions::new(7, 5));
            assert_eq!(pixels.channels(), 4);
        }
    }

    #[test]
    fn test_decoded_png_pixels() {
        let bytes = encode(ImageFormat::Png, 3, 2);
        let source = ImageSource::from_bytes("pixels.png", &bytes);
        let pixels = CodecDecoder::png().decode(&source).unwrap();
        assert_eq!(pixels.pixel(2, 1), Some(&[2u8, 1, 50, 255][..]));
    }

    #[test]
    fn test_truncated_data_fails() {
        let bytes = encode(ImageFormat::Png, 16, 16);
        let truncated = &bytes[..bytes.len() / 2];
        let source = ImageSource::from_bytes("broken.png", truncated);
        assert!(CodecDecoder::png().decode(&source).is_err());
    }

    #[test]
    fn test_unknown_always_fails() {
        let source = ImageSource::from_bytes("mystery", b"\x00\x01\x02\x03");
        assert!(matches!(
            UnknownDecoder.measure(&source),
            Err(DecodeError::UnknownFormat { name }) if name == "mystery"
        ));
        assert!(UnknownDecoder.decode(&source).is_err());
        assert!(!UnknownDecoder.probe(b"anything"));
    }
}
