//! Shared Image Cache Library
//!
//! Reference-counted, name-keyed image cache with lazy decoding and a
//! least-recently-used pixel budget.

pub mod cache;
pub mod config;
pub mod decoder;
pub mod draw;
pub mod entry;
pub mod error;
mod eviction;
pub mod formats;
mod index;
pub mod pixels;
pub mod source;

pub use cache::{CacheStats, ImageHandle, SharedImageCache};
pub use config::{CacheConfig, DEFAULT_HEADER_PROBE_SIZE};
pub use decoder::{is_unknown, DecoderRegistry, ImageDecoder};
pub use draw::{Blitter, CountingBlitter, Point, Rect};
pub use entry::{DecodeState, EntryId};
pub use error::{ConfigError, DecodeError};
pub use formats::{CodecDecoder, UnknownDecoder};
pub use image::Rgb;
pub use pixels::{Dimensions, PixelBuffer, PixelTransform};
pub use source::{ImageSource, SourceReader};
