//! Error types for the shared image cache.

use std::path::PathBuf;

/// Errors produced while measuring or decoding an image resource.
///
/// These never escape [`SharedImageCache::draw`](crate::SharedImageCache::draw)
/// or [`SharedImageCache::measure`](crate::SharedImageCache::measure); they are
/// only surfaced through the `try_*` variants for callers that want diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Reading the backing file failed.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No registered decoder recognised the data.
    #[error("unknown image format for '{name}'")]
    UnknownFormat { name: String },

    /// The underlying codec rejected the data.
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// The decoder produced a pixel buffer that does not match its dimensions.
    #[error("decoded buffer for '{name}' does not match {width}x{height}")]
    InvalidDimensions { name: String, width: u32, height: u32 },

    /// The entry already failed once and will not retry until reloaded.
    #[error("'{name}' previously failed to decode; reload it to retry")]
    PreviouslyFailed { name: String },

    /// The entry has neither in-memory bytes nor a readable path.
    #[error("no source data for '{name}'")]
    MissingSource { name: String },
}

/// Errors that can occur while loading or saving a [`CacheConfig`](crate::CacheConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
