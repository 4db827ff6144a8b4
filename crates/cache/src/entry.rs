//! Per-resource cache record and its decode state machine.
//!
//! ```text
//! Unmeasured --measure--> MeasuredUndecoded --decode--> Decoded
//!      ^                        ^                          |
//!      |                        +---------evict------------+
//!      +------reload (from any state, including Failed)
//! any --measure/decode error--> Failed
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::decoder::ImageDecoder;
use crate::error::DecodeError;
use crate::pixels::{Dimensions, PixelBuffer, PixelTransform};
use crate::source::ImageSource;

/// Stable identity of an entry for as long as it lives in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl EntryId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Observable decode state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeState {
    /// Dimensions have never been read.
    Unmeasured,
    /// Dimensions are known; no pixels are held.
    MeasuredUndecoded,
    /// Pixels are held and charged against the budget.
    Decoded,
    /// Measuring or decoding failed; dimensions are (0,0) until reloaded.
    Failed,
}

impl DecodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeState::Unmeasured => "unmeasured",
            DecodeState::MeasuredUndecoded => "measured",
            DecodeState::Decoded => "decoded",
            DecodeState::Failed => "failed",
        }
    }
}

// Pixels live inside the Decoded variant so they cannot exist in any other state.
enum EntryState {
    Unmeasured,
    Measured,
    Decoded(PixelBuffer),
    Failed,
}

pub(crate) struct ImageEntry {
    id: EntryId,
    name: Arc<str>,
    refcount: usize,
    state: EntryState,
    dimensions: Option<Dimensions>,
    last_used: u64,
    source_bytes: Option<Arc<[u8]>>,
    decoder: Arc<dyn ImageDecoder>,
    /// Size a sized copy is scaled to; `None` for an original.
    target: Option<Dimensions>,
    transforms: Vec<PixelTransform>,
}

impl ImageEntry {
    pub(crate) fn new(
        id: EntryId,
        name: Arc<str>,
        source_bytes: Option<Arc<[u8]>>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> Self {
        Self {
            id,
            name,
            refcount: 1,
            state: EntryState::Unmeasured,
            dimensions: None,
            last_used: 0,
            source_bytes,
            decoder,
            target: None,
            transforms: Vec::new(),
        }
    }

    /// Turns the entry into a copy scaled to `size`.
    pub(crate) fn with_target(mut self, size: Dimensions) -> Self {
        self.target = Some(size);
        self
    }

    pub(crate) fn target(&self) -> Option<Dimensions> {
        self.target
    }

    pub(crate) fn id(&self) -> EntryId {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn refcount(&self) -> usize {
        self.refcount
    }

    pub(crate) fn acquire(&mut self) {
        self.refcount += 1;
    }

    /// Drops one reference and returns how many remain.
    pub(crate) fn release(&mut self) -> usize {
        debug_assert!(self.refcount > 0, "refcount underflow on '{}'", self.name);
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount
    }

    pub(crate) fn state(&self) -> DecodeState {
        match self.state {
            EntryState::Unmeasured => DecodeState::Unmeasured,
            EntryState::Measured => DecodeState::MeasuredUndecoded,
            EntryState::Decoded(_) => DecodeState::Decoded,
            EntryState::Failed => DecodeState::Failed,
        }
    }

    pub(crate) fn is_decoded(&self) -> bool {
        matches!(self.state, EntryState::Decoded(_))
    }

    /// `None` until measured.
    pub(crate) fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub(crate) fn pixels(&self) -> Option<&PixelBuffer> {
        match &self.state {
            EntryState::Decoded(pixels) => Some(pixels),
            _ => None,
        }
    }

    /// Area currently charged for this entry.
    pub(crate) fn charged_area(&self) -> usize {
        self.pixels().map_or(0, PixelBuffer::area)
    }

    pub(crate) fn last_used(&self) -> u64 {
        self.last_used
    }

    /// Records a new usage stamp and returns the previous one.
    pub(crate) fn touch(&mut self, stamp: u64) -> u64 {
        std::mem::replace(&mut self.last_used, stamp)
    }

    pub(crate) fn source_bytes(&self) -> Option<&Arc<[u8]>> {
        self.source_bytes.as_ref()
    }

    pub(crate) fn set_source_bytes(&mut self, bytes: Arc<[u8]>) {
        self.source_bytes = Some(bytes);
    }

    pub(crate) fn decoder(&self) -> &Arc<dyn ImageDecoder> {
        &self.decoder
    }

    pub(crate) fn set_decoder(&mut self, decoder: Arc<dyn ImageDecoder>) {
        self.decoder = decoder;
    }

    /// Records a pixel edit, applying it now if pixels are held. Edits are
    /// replayed after every later decode.
    pub(crate) fn add_transform(&mut self, transform: PixelTransform) {
        if let EntryState::Decoded(pixels) = &mut self.state {
            transform.apply(pixels);
        }
        self.transforms.push(transform);
    }

    fn source<'a>(&'a self, path: &'a Path) -> ImageSource<'a> {
        ImageSource::new(&self.name, path, self.source_bytes.as_deref())
    }

    /// Reads the dimensions, invoking the decoder only from `Unmeasured`.
    ///
    /// A failed entry answers `PreviouslyFailed` without touching the decoder.
    /// A sized copy reports its target size once the source has been read.
    pub(crate) fn measure(&mut self, path: &Path) -> Result<Dimensions, DecodeError> {
        match self.state {
            EntryState::Failed => Err(DecodeError::PreviouslyFailed { name: self.name.to_string() }),
            EntryState::Measured | EntryState::Decoded(_) => {
                Ok(self.dimensions.unwrap_or(Dimensions::ZERO))
            }
            EntryState::Unmeasured => {
                let result = self.decoder.measure(&self.source(path));
                match result {
                    Ok(measured) => {
                        let dimensions = self.target.unwrap_or(measured);
                        self.dimensions = Some(dimensions);
                        self.state = EntryState::Measured;
                        Ok(dimensions)
                    }
                    Err(error) => {
                        self.fail();
                        Err(error)
                    }
                }
            }
        }
    }

    /// Decodes pixels, measuring first if needed, and returns the area of
    /// the decoded buffer. An already decoded entry returns its current area.
    ///
    /// The caller owns the budget accounting.
    pub(crate) fn decode(&mut self, path: &Path) -> Result<usize, DecodeError> {
        match self.state {
            EntryState::Decoded(ref pixels) => return Ok(pixels.area()),
            EntryState::Failed => {
                return Err(DecodeError::PreviouslyFailed { name: self.name.to_string() })
            }
            EntryState::Unmeasured => {
                self.measure(path)?;
            }
            EntryState::Measured => {}
        }

        let result = self.decoder.decode(&self.source(path)).and_then(|pixels| self.finish(pixels));
        match result {
            Ok(pixels) => {
                let area = pixels.area();
                self.dimensions = Some(pixels.dimensions());
                self.state = EntryState::Decoded(pixels);
                Ok(area)
            }
            Err(error) => {
                self.fail();
                Err(error)
            }
        }
    }

    /// Scales a fresh decode to the target size and replays the edits.
    fn finish(&self, pixels: PixelBuffer) -> Result<PixelBuffer, DecodeError> {
        let mut pixels = match self.target {
            Some(target) if target != pixels.dimensions() => {
                pixels.resized(target.width, target.height).ok_or_else(|| {
                    DecodeError::InvalidDimensions {
                        name: self.name.to_string(),
                        width: target.width,
                        height: target.height,
                    }
                })?
            }
            _ => pixels,
        };
        for transform in &self.transforms {
            transform.apply(&mut pixels);
        }
        Ok(pixels)
    }

    /// Drops the pixels, keeping the dimensions. Returns the freed area, or
    /// `None` if the entry was not decoded.
    pub(crate) fn evict(&mut self) -> Option<usize> {
        if !self.is_decoded() {
            return None;
        }
        let freed = self.charged_area();
        self.state = EntryState::Measured;
        Some(freed)
    }

    /// Resets to `Unmeasured` from any state and optionally replaces the
    /// in-memory source. Pixel edits are dropped; a sized copy keeps its
    /// target size. Returns the pixel area that was released.
    pub(crate) fn reload(&mut self, new_bytes: Option<Arc<[u8]>>) -> usize {
        let freed = self.charged_area();
        self.state = EntryState::Unmeasured;
        self.dimensions = None;
        self.transforms.clear();
        if let Some(bytes) = new_bytes {
            self.source_bytes = Some(bytes);
        }
        freed
    }

    fn fail(&mut self) {
        self.state = EntryState::Failed;
        self.dimensions = Some(Dimensions::ZERO);
    }
}
