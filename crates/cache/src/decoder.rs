//! Decoder contract and the ordered registry used to sniff formats.
//!
//! Formats are identified by content, never by file extension: each decoder
//! exposes a pure predicate over the leading bytes of the data and the first
//! registered decoder whose predicate accepts the header wins.

use std::fmt;
use std::sync::Arc;

use crate::config::DEFAULT_HEADER_PROBE_SIZE;
use crate::error::DecodeError;
use crate::formats::{CodecDecoder, UnknownDecoder};
use crate::pixels::{Dimensions, PixelBuffer};
use crate::source::ImageSource;

/// A format decoder.
///
/// `probe` must not perform I/O and must treat a header shorter than its
/// signature as a non-match. `measure` should parse only as much as needed
/// to report dimensions; `decode` produces the full pixel buffer.
pub trait ImageDecoder: Send + Sync {
    /// Lowercase format name. Registration is keyed on it.
    fn name(&self) -> &str;

    /// Returns true if `header` looks like this format.
    fn probe(&self, header: &[u8]) -> bool;

    /// Reads the image dimensions.
    fn measure(&self, source: &ImageSource<'_>) -> Result<Dimensions, DecodeError>;

    /// Decodes the full image.
    fn decode(&self, source: &ImageSource<'_>) -> Result<PixelBuffer, DecodeError>;
}

impl fmt::Debug for dyn ImageDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageDecoder").field(&self.name()).finish()
    }
}

/// Ordered list of decoders consulted by [`identify`](Self::identify).
pub struct DecoderRegistry {
    decoders: Vec<Arc<dyn ImageDecoder>>,
    unknown: Arc<dyn ImageDecoder>,
    probe_size: usize,
}

impl DecoderRegistry {
    /// Creates a registry with no decoders; everything identifies as unknown.
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
            unknown: Arc::new(UnknownDecoder),
            probe_size: DEFAULT_HEADER_PROBE_SIZE,
        }
    }

    /// Creates a registry with the built-in BMP, GIF, PNG, JPEG and PNM decoders.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for decoder in CodecDecoder::builtin() {
            registry.register(Arc::new(decoder));
        }
        registry
    }

    /// Sets how many header bytes predicates are shown.
    ///
    /// A [`SharedImageCache`](crate::SharedImageCache) overrides this with
    /// its configured `header_probe_size`.
    pub fn with_probe_size(mut self, size: usize) -> Self {
        self.set_probe_size(size);
        self
    }

    pub fn set_probe_size(&mut self, size: usize) {
        self.probe_size = size.max(1);
    }

    pub fn probe_size(&self) -> usize {
        self.probe_size
    }

    /// Appends a decoder. Registering a name twice is a no-op.
    ///
    /// Returns true if the decoder was added.
    pub fn register(&mut self, decoder: Arc<dyn ImageDecoder>) -> bool {
        if self.contains(decoder.name()) {
            return false;
        }
        log::debug!("DecoderRegistry: registered '{}'", decoder.name());
        self.decoders.push(decoder);
        true
    }

    /// Removes the decoder with the given name, keeping the order of the rest.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.decoders.len();
        self.decoders.retain(|decoder| decoder.name() != name);
        before != self.decoders.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.iter().any(|decoder| decoder.name() == name)
    }

    /// Registered decoder names in probe order.
    pub fn names(&self) -> Vec<String> {
        self.decoders.iter().map(|decoder| decoder.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Finds the decoder for `data`, or the unknown sentinel.
    ///
    /// Predicates see at most [`probe_size`](Self::probe_size) bytes.
    pub fn identify(&self, data: &[u8]) -> Arc<dyn ImageDecoder> {
        let header = &data[..data.len().min(self.probe_size)];
        self.decoders
            .iter()
            .find(|decoder| decoder.probe(header))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.unknown))
    }

    /// The sentinel returned when nothing matches.
    pub fn unknown(&self) -> Arc<dyn ImageDecoder> {
        Arc::clone(&self.unknown)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.names())
            .field("probe_size", &self.probe_size)
            .finish()
    }
}

/// Returns true if `decoder` is the unknown sentinel.
pub fn is_unknown(decoder: &dyn ImageDecoder) -> bool {
    decoder.name() == UnknownDecoder::NAME
}
