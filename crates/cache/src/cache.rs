//! Shared, reference-counted image cache with a pixel budget.
//!
//! Widgets ask for images by name. Every request for the same name shares
//! one entry; the entry is decoded lazily on first draw and its pixels are
//! evicted, least recently used first, whenever the decoded total would
//! reach the configured budget. Entries themselves live until the last
//! holder removes them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use image::Rgb;

use crate::config::CacheConfig;
use crate::decoder::{is_unknown, DecoderRegistry, ImageDecoder};
use crate::draw::{Blitter, Point, Rect};
use crate::entry::{DecodeState, EntryId, ImageEntry};
use crate::error::DecodeError;
use crate::eviction::{self, LruIndex, MemoryLedger};
use crate::index::CacheIndex;
use crate::pixels::{Dimensions, PixelBuffer, PixelTransform};
use crate::source::ImageSource;

/// A holder's reference to a cached image.
///
/// Obtained from [`SharedImageCache::get`]; give it back with
/// [`SharedImageCache::release`]. Two handles for the same name and size
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    id: EntryId,
    name: Arc<str>,
}

impl ImageHandle {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the index
    pub entry_count: usize,

    /// Number of entries currently holding pixels
    pub decoded_count: usize,

    /// Decoded pixel area currently charged
    pub memory_used: usize,

    /// Pixel budget (0 = unlimited)
    pub memory_limit: usize,

    /// `get` calls that found an existing entry
    pub hits: u64,

    /// `get` calls that created an entry
    pub misses: u64,

    /// Successful decodes
    pub decodes: u64,

    /// Entries whose pixels were dropped to satisfy the budget
    pub evictions: u64,

    /// Failed measure or decode attempts
    pub decode_failures: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate memory utilization (0.0 to 1.0)
    pub fn memory_utilization(&self) -> f64 {
        if self.memory_limit == 0 {
            0.0
        } else {
            self.memory_used as f64 / self.memory_limit as f64
        }
    }
}

/// Internal cache state
struct CacheState {
    config: CacheConfig,
    registry: DecoderRegistry,
    index: CacheIndex,
    entries: HashMap<EntryId, ImageEntry>,
    lru: LruIndex,
    ledger: MemoryLedger,
    /// Source of last-used stamps; only ever increases.
    usage_counter: u64,
    next_id: u64,
    stats: CacheStats,
}

impl CacheState {
    fn new(config: CacheConfig, mut registry: DecoderRegistry) -> Self {
        registry.set_probe_size(config.header_probe_size);
        let ledger = MemoryLedger::new(config.memory_limit);
        Self {
            config,
            registry,
            index: CacheIndex::new(),
            entries: HashMap::new(),
            lru: LruIndex::new(),
            ledger,
            usage_counter: 0,
            next_id: 0,
            stats: CacheStats::default(),
        }
    }

    fn next_stamp(&mut self) -> u64 {
        self.usage_counter += 1;
        self.usage_counter
    }

    /// Marks an entry as just used, keeping the LRU index in step.
    fn touch(&mut self, id: EntryId) {
        let stamp = self.next_stamp();
        if let Some(entry) = self.entries.get_mut(&id) {
            let previous = entry.touch(stamp);
            if entry.is_decoded() {
                self.lru.touch(previous, stamp);
            }
        }
    }

    fn identify(&self, name: &str, bytes: Option<&[u8]>) -> Arc<dyn ImageDecoder> {
        let path = self.config.resolve_path(name);
        let source = ImageSource::new(name, &path, bytes);
        match source.read_header(self.registry.probe_size()) {
            Ok(header) => {
                let decoder = self.registry.identify(&header);
                if is_unknown(decoder.as_ref()) {
                    log::warn!("SharedImageCache: unknown image format for '{}'", name);
                }
                decoder
            }
            Err(error) => {
                log::warn!("SharedImageCache: cannot probe '{}': {}", name, error);
                self.registry.unknown()
            }
        }
    }

    fn get(&mut self, name: &str, bytes: Option<Arc<[u8]>>) -> ImageHandle {
        let id = match self.index.find(name) {
            Some(id) => {
                self.stats.hits += 1;
                self.attach(id, bytes);
                id
            }
            None => {
                self.stats.misses += 1;
                self.create(name, None, bytes)
            }
        };
        self.touch(id);
        self.handle(id, name)
    }

    /// Like `get` for a copy of `name` scaled to `size`.
    ///
    /// An empty size, or the size the original already has, yields the
    /// original. A new copy reads the original's bytes when none are given.
    fn get_sized(&mut self, name: &str, bytes: Option<Arc<[u8]>>, size: Dimensions) -> ImageHandle {
        if size.is_empty() {
            return self.get(name, bytes);
        }
        if let Some(id) = self.index.find_sized(name, size) {
            self.stats.hits += 1;
            self.attach(id, bytes);
            self.touch(id);
            return self.handle(id, name);
        }

        let original = self.index.find(name);
        if let Some(original) = original {
            if self.measure(original).ok() == Some(size) {
                return self.get(name, bytes);
            }
        }

        self.stats.misses += 1;
        let bytes = bytes.or_else(|| {
            original
                .and_then(|id| self.entries.get(&id))
                .and_then(|entry| entry.source_bytes().cloned())
        });
        let id = self.create(name, Some(size), bytes);
        self.touch(id);
        self.handle(id, name)
    }

    fn handle(&self, id: EntryId, name: &str) -> ImageHandle {
        let name = self
            .entries
            .get(&id)
            .map(|entry| Arc::clone(entry.name()))
            .unwrap_or_else(|| Arc::from(name));
        ImageHandle { id, name }
    }

    fn create(&mut self, name: &str, size: Option<Dimensions>, bytes: Option<Arc<[u8]>>) -> EntryId {
        let decoder = self.identify(name, bytes.as_deref());
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let name: Arc<str> = Arc::from(name);
        self.index.insert(Arc::clone(&name), size, id);
        log::debug!(
            "SharedImageCache: created '{}' {:?} as {} ({:?})",
            name,
            size,
            decoder.name(),
            id
        );
        let mut entry = ImageEntry::new(id, name, bytes, decoder);
        if let Some(size) = size {
            entry = entry.with_target(size);
        }
        self.entries.insert(id, entry);
        id
    }

    /// Extra reference to an existing entry. Bytes are only adopted by an
    /// entry that has none yet.
    fn attach(&mut self, id: EntryId, bytes: Option<Arc<[u8]>>) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.acquire();

        let Some(bytes) = bytes else {
            return;
        };
        if entry.source_bytes().is_some() {
            return;
        }
        entry.set_source_bytes(bytes);

        // Re-sniff from the new bytes unless the entry has already been read.
        if entry.state() == DecodeState::Unmeasured {
            let name = Arc::clone(entry.name());
            let bytes = entry.source_bytes().cloned();
            let decoder = self.identify(&name, bytes.as_deref());
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.set_decoder(decoder);
            }
        }
    }

    fn entry(&self, id: EntryId) -> Option<&ImageEntry> {
        let entry = self.entries.get(&id);
        if entry.is_none() {
            log::error!("SharedImageCache: use of destroyed entry {:?}", id);
        }
        entry
    }

    fn measure(&mut self, id: EntryId) -> Result<Dimensions, DecodeError> {
        let path = match self.entry(id) {
            Some(entry) => self.config.resolve_path(entry.name()),
            None => return Ok(Dimensions::ZERO),
        };
        let Some(entry) = self.entries.get_mut(&id) else {
            return Ok(Dimensions::ZERO);
        };

        let was_unmeasured = entry.state() == DecodeState::Unmeasured;
        let result = entry.measure(&path);
        if let Err(error) = &result {
            if was_unmeasured {
                self.stats.decode_failures += 1;
                log::warn!("SharedImageCache: failed to measure '{}': {}", entry.name(), error);
            }
        }
        result
    }

    /// Brings an entry to `Decoded`, running the eviction sweep first.
    ///
    /// The projected area is charged before the sweep runs. The entry is not
    /// in the LRU index yet, so it is never chosen as its own victim. A
    /// decode that comes out larger or smaller than measured sweeps again
    /// against the actual area.
    fn ensure_decoded(&mut self, id: EntryId) -> Result<Dimensions, DecodeError> {
        let dimensions = self.measure(id)?;
        let Some(entry) = self.entries.get(&id) else {
            return Ok(Dimensions::ZERO);
        };
        if entry.is_decoded() || dimensions.is_empty() {
            return Ok(dimensions);
        }
        let path = self.config.resolve_path(entry.name());

        self.touch(id);
        let projected = dimensions.area();
        self.ledger.charge(projected);
        self.run_sweep();

        let Some(entry) = self.entries.get_mut(&id) else {
            self.ledger.release(projected);
            return Ok(Dimensions::ZERO);
        };
        let result = entry.decode(&path);
        let stamp = entry.last_used();
        let name = Arc::clone(entry.name());
        let decoded = entry.dimensions().unwrap_or(Dimensions::ZERO);
        self.ledger.release(projected);

        match result {
            Ok(area) => {
                self.ledger.charge(area);
                if area != projected {
                    self.run_sweep();
                }
                self.lru.insert(stamp, id);
                self.stats.decodes += 1;
                log::debug!(
                    "SharedImageCache: decoded '{}' ({} pixels, {} of {} used)",
                    name,
                    area,
                    self.ledger.used(),
                    self.ledger.limit()
                );
                Ok(decoded)
            }
            Err(error) => {
                self.stats.decode_failures += 1;
                log::warn!("SharedImageCache: failed to decode '{}': {}", name, error);
                Err(error)
            }
        }
    }

    fn run_sweep(&mut self) {
        let entries = &mut self.entries;
        let evicted = eviction::sweep(&mut self.ledger, &mut self.lru, |victim| {
            entries.get_mut(&victim).and_then(ImageEntry::evict).unwrap_or(0)
        });
        self.stats.evictions += evicted as u64;
    }

    fn draw(
        &mut self,
        id: EntryId,
        dest: Rect,
        src: Point,
        blitter: &mut dyn Blitter,
    ) -> Result<bool, DecodeError> {
        let dimensions = self.ensure_decoded(id)?;
        if dimensions.is_empty() {
            return Ok(false);
        }
        let drawn = match self.entries.get(&id).and_then(ImageEntry::pixels) {
            Some(pixels) => {
                blitter.draw_pixels(pixels, dest, src);
                true
            }
            None => false,
        };
        self.touch(id);
        Ok(drawn)
    }

    /// Drops the pixels of a decoded entry and uncharges them.
    fn discard_pixels(&mut self, id: EntryId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        let stamp = entry.last_used();
        if let Some(freed) = entry.evict() {
            self.lru.remove(stamp);
            self.ledger.release(freed);
        }
    }

    fn remove(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            log::error!("SharedImageCache: release of destroyed entry {:?}", id);
            return false;
        };
        if entry.release() > 0 {
            return false;
        }

        self.discard_pixels(id);
        if let Some(entry) = self.entries.remove(&id) {
            if !self.index.remove(entry.name(), entry.target(), id) {
                log::error!("SharedImageCache: '{}' missing from index on removal", entry.name());
            }
            log::debug!("SharedImageCache: destroyed '{}' ({:?})", entry.name(), entry.id());
        }
        true
    }

    fn reload(&mut self, id: EntryId, bytes: Option<Arc<[u8]>>) {
        let Some(entry) = self.entries.get_mut(&id) else {
            log::error!("SharedImageCache: reload of destroyed entry {:?}", id);
            return;
        };
        let stamp = entry.last_used();
        let was_decoded = entry.is_decoded();
        let freed = entry.reload(bytes);
        if was_decoded {
            self.lru.remove(stamp);
            self.ledger.release(freed);
        }

        let name = Arc::clone(entry.name());
        let source_bytes = entry.source_bytes().cloned();
        let decoder = self.identify(&name, source_bytes.as_deref());
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.set_decoder(decoder);
        }
        log::debug!("SharedImageCache: reloaded '{}'", name);
    }

    /// Records a pixel edit on the entry. Returns false if it is destroyed.
    fn transform(&mut self, id: EntryId, transform: PixelTransform) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            log::error!("SharedImageCache: edit of destroyed entry {:?}", id);
            return false;
        };
        entry.add_transform(transform);
        true
    }

    fn clear_cache(&mut self) {
        let mut freed_total = 0;
        for entry in self.entries.values_mut() {
            if let Some(freed) = entry.evict() {
                freed_total += freed;
            }
        }
        self.ledger.release(freed_total);
        self.lru.clear();
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.index.len(),
            decoded_count: self.lru.len(),
            memory_used: self.ledger.used(),
            memory_limit: self.ledger.limit(),
            ..self.stats
        }
    }
}

/// Shared image cache.
///
/// Cloning yields another handle to the same cache. All operations are
/// serialised through one lock; decoding happens while it is held.
///
/// # Example
///
/// ```no_run
/// use sharedimg_cache::{CacheConfig, CountingBlitter, Point, Rect, SharedImageCache};
///
/// let cache = SharedImageCache::new(CacheConfig::default().with_memory_limit(1 << 20));
/// let logo = cache.get_file("logo.png");
///
/// let size = cache.measure(&logo);
/// let mut blitter = CountingBlitter::default();
/// cache.draw(&logo, Rect::new(0, 0, size.width, size.height), Point::ORIGIN, &mut blitter);
///
/// cache.release(logo);
/// ```
#[derive(Clone)]
pub struct SharedImageCache {
    state: Arc<Mutex<CacheState>>,
}

impl SharedImageCache {
    /// Create a cache with the built-in decoders.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_registry(config, DecoderRegistry::with_builtin())
    }

    /// Create a cache that identifies formats with `registry`.
    ///
    /// The header probe size of `config` replaces the one set on `registry`.
    pub fn with_registry(config: CacheConfig, registry: DecoderRegistry) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(config, registry))),
        }
    }

    /// The process-wide cache, created on first use from the environment.
    pub fn global() -> &'static SharedImageCache {
        static GLOBAL: OnceLock<SharedImageCache> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = CacheConfig::from_env().unwrap_or_else(|error| {
                log::warn!("SharedImageCache: ignoring environment configuration: {}", error);
                CacheConfig::default()
            });
            SharedImageCache::new(config)
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `name`, creating the entry if needed, and take a reference.
    ///
    /// New entries sniff their format from `bytes`, or from the file the
    /// name resolves to when `bytes` is `None`. An existing entry that has no
    /// bytes yet adopts the ones given here.
    pub fn get(&self, name: &str, bytes: Option<Arc<[u8]>>) -> ImageHandle {
        self.lock().get(name, bytes)
    }

    /// [`get`](Self::get) for an image read from the filesystem.
    pub fn get_file(&self, name: &str) -> ImageHandle {
        self.get(name, None)
    }

    /// [`get`](Self::get) for an image held in memory.
    pub fn get_bytes(&self, name: &str, bytes: impl Into<Arc<[u8]>>) -> ImageHandle {
        self.get(name, Some(bytes.into()))
    }

    /// Reference to a copy of `name` scaled to `width` x `height`.
    ///
    /// Each size is its own shared entry, decoded from the same source as the
    /// original and resized on decode. A zero width or height, or the size
    /// the original already measures at, returns the original instead.
    pub fn get_sized(
        &self,
        name: &str,
        bytes: Option<Arc<[u8]>>,
        width: u32,
        height: u32,
    ) -> ImageHandle {
        self.lock().get_sized(name, bytes, Dimensions::new(width, height))
    }

    /// Reference to a copy of the image scaled to `width` x `height`.
    ///
    /// Returns `None` if `handle` has been destroyed. Pixel edits made to
    /// `handle` are not carried over.
    pub fn copy(&self, handle: &ImageHandle, width: u32, height: u32) -> Option<ImageHandle> {
        let mut state = self.lock();
        let bytes = state.entry(handle.id)?.source_bytes().cloned();
        Some(state.get_sized(&handle.name, bytes, Dimensions::new(width, height)))
    }

    /// Look up an entry without taking a reference.
    pub fn find(&self, name: &str) -> Option<ImageHandle> {
        let state = self.lock();
        let id = state.index.find(name)?;
        let entry = state.entries.get(&id)?;
        Some(ImageHandle { id, name: Arc::clone(entry.name()) })
    }

    /// Look up the copy of `name` sized `width` x `height` without taking a
    /// reference.
    pub fn find_sized(&self, name: &str, width: u32, height: u32) -> Option<ImageHandle> {
        let state = self.lock();
        let id = state.index.find_sized(name, Dimensions::new(width, height))?;
        let entry = state.entries.get(&id)?;
        Some(ImageHandle { id, name: Arc::clone(entry.name()) })
    }

    /// Dimensions of the image; (0,0) if it cannot be read.
    pub fn measure(&self, handle: &ImageHandle) -> Dimensions {
        self.try_measure(handle).unwrap_or(Dimensions::ZERO)
    }

    /// Like [`measure`](Self::measure) but reports why measuring failed.
    pub fn try_measure(&self, handle: &ImageHandle) -> Result<Dimensions, DecodeError> {
        self.lock().measure(handle.id)
    }

    /// Decode the image without drawing it. Returns false on failure.
    pub fn decode(&self, handle: &ImageHandle) -> bool {
        self.try_decode(handle).map(|d| !d.is_empty()).unwrap_or(false)
    }

    /// Decode the image, evicting older images if the budget requires it.
    pub fn try_decode(&self, handle: &ImageHandle) -> Result<Dimensions, DecodeError> {
        let mut state = self.lock();
        let dimensions = state.ensure_decoded(handle.id)?;
        state.touch(handle.id);
        Ok(dimensions)
    }

    /// Draw the image, decoding it first if needed.
    ///
    /// Images that cannot be decoded draw nothing. Returns whether pixels
    /// were handed to `blitter`.
    pub fn draw(
        &self,
        handle: &ImageHandle,
        dest: Rect,
        src: Point,
        blitter: &mut dyn Blitter,
    ) -> bool {
        self.try_draw(handle, dest, src, blitter).unwrap_or(false)
    }

    /// Like [`draw`](Self::draw) but reports decode failures.
    pub fn try_draw(
        &self,
        handle: &ImageHandle,
        dest: Rect,
        src: Point,
        blitter: &mut dyn Blitter,
    ) -> Result<bool, DecodeError> {
        self.lock().draw(handle.id, dest, src, blitter)
    }

    /// Convert the image to grayscale, dropping color channels.
    ///
    /// The edit is kept with the entry and reapplied whenever its pixels are
    /// decoded again, until [`reload`](Self::reload). Returns false if the
    /// entry has been destroyed.
    pub fn desaturate(&self, handle: &ImageHandle) -> bool {
        self.lock().transform(handle.id, PixelTransform::Desaturate)
    }

    /// Blend the image toward `color`. A `weight` of 1.0 keeps the image,
    /// 0.0 gives solid `color`. Kept like [`desaturate`](Self::desaturate).
    pub fn color_average(&self, handle: &ImageHandle, color: Rgb<u8>, weight: f32) -> bool {
        self.lock().transform(handle.id, PixelTransform::ColorAverage { color, weight })
    }

    /// Give back a reference. Returns true if this destroyed the entry.
    pub fn release(&self, handle: ImageHandle) -> bool {
        self.lock().remove(handle.id)
    }

    /// Drop one reference to the original image `name`. Returns true if this
    /// destroyed the entry, false if holders remain or the name is unknown.
    /// Sized copies are released through their handles.
    pub fn remove(&self, name: &str) -> bool {
        let mut state = self.lock();
        match state.index.find(name) {
            Some(id) => state.remove(id),
            None => false,
        }
    }

    /// Reset the entry so the next use measures and decodes it again,
    /// optionally replacing its in-memory data. References are unaffected.
    pub fn reload(&self, handle: &ImageHandle, bytes: Option<Arc<[u8]>>) {
        self.lock().reload(handle.id, bytes);
    }

    /// [`reload`](Self::reload) by name. Returns false if the name is unknown.
    pub fn reload_by_name(&self, name: &str, bytes: Option<Arc<[u8]>>) -> bool {
        let mut state = self.lock();
        match state.index.find(name) {
            Some(id) => {
                state.reload(id, bytes);
                true
            }
            None => false,
        }
    }

    /// Set the pixel budget (0 = unlimited).
    ///
    /// Nothing is evicted here; the next decode enforces the new limit.
    pub fn set_cache_limit(&self, limit: usize) {
        let mut state = self.lock();
        state.ledger.set_limit(limit);
        state.config.memory_limit = limit;
    }

    pub fn cache_limit(&self) -> usize {
        self.lock().ledger.limit()
    }

    /// Decoded pixel area currently held.
    pub fn memory_used(&self) -> usize {
        self.lock().ledger.used()
    }

    /// Set the directory relative names are read from.
    pub fn set_root_directory(&self, root: Option<PathBuf>) {
        self.lock().config.root_directory = root;
    }

    pub fn root_directory(&self) -> Option<PathBuf> {
        self.lock().config.root_directory.clone()
    }

    /// Drop the pixels of every decoded image. Entries stay.
    pub fn clear_cache(&self) {
        self.lock().clear_cache();
    }

    /// Add a decoder after the existing ones. Returns false if a decoder
    /// with the same name is already registered.
    pub fn register_decoder(&self, decoder: Arc<dyn ImageDecoder>) -> bool {
        self.lock().registry.register(decoder)
    }

    pub fn unregister_decoder(&self, name: &str) -> bool {
        self.lock().registry.unregister(name)
    }

    /// Decoder that would be chosen for `data`.
    pub fn identify(&self, data: &[u8]) -> Arc<dyn ImageDecoder> {
        self.lock().registry.identify(data)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().index.find(name).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().index.is_empty()
    }

    /// Distinct image names in index order.
    pub fn names(&self) -> Vec<String> {
        self.lock().index.names().map(str::to_string).collect()
    }

    /// `None` once the entry has been destroyed.
    pub fn state(&self, handle: &ImageHandle) -> Option<DecodeState> {
        self.lock().entries.get(&handle.id).map(ImageEntry::state)
    }

    /// Size a sized copy scales to; `None` for originals and destroyed entries.
    pub fn target_size(&self, handle: &ImageHandle) -> Option<Dimensions> {
        self.lock().entries.get(&handle.id).and_then(ImageEntry::target)
    }

    /// Known dimensions, or `None` if unmeasured or destroyed.
    pub fn dimensions(&self, handle: &ImageHandle) -> Option<Dimensions> {
        self.lock().entries.get(&handle.id).and_then(ImageEntry::dimensions)
    }

    /// Number of holders; 0 once destroyed.
    pub fn refcount(&self, handle: &ImageHandle) -> usize {
        self.lock().entries.get(&handle.id).map_or(0, ImageEntry::refcount)
    }

    pub fn last_used(&self, handle: &ImageHandle) -> Option<u64> {
        self.lock().entries.get(&handle.id).map(ImageEntry::last_used)
    }

    /// Name of the decoder the entry was identified with.
    pub fn format(&self, handle: &ImageHandle) -> Option<String> {
        self.lock().entries.get(&handle.id).map(|entry| entry.decoder().name().to_string())
    }

    pub fn has_pixels(&self, handle: &ImageHandle) -> bool {
        self.lock().entries.get(&handle.id).is_some_and(ImageEntry::is_decoded)
    }

    /// Run `f` on the decoded pixels, if any. Does not count as a use.
    pub fn with_pixels<R>(&self, handle: &ImageHandle, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        let state = self.lock();
        state.entries.get(&handle.id).and_then(ImageEntry::pixels).map(f)
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }
}

impl Default for SharedImageCache {
    /// Unlimited cache with the built-in decoders.
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
