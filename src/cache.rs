//! Process-wide, bounded, TTL-expiring caches.
//!
//! Structured as an owned service (`Caches`) rather than implicit globals so a
//! test harness can always construct a [`crate::pipeline::PipelineDriver`] with a
//! fresh cache. Guarded by a plain `Mutex` per cache — concurrent duplicate
//! computation on a cache miss is tolerated because every value here is a pure
//! function of its key.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const TILES_CAPACITY: usize = 64;
const TILES_TTL: Duration = Duration::from_secs(300);
const MASKS_CAPACITY: usize = 128;
const MASKS_TTL: Duration = Duration::from_secs(120);
const TEXTURE_CONFIG_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Thread,
    Hatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub kind: TileKind,
    pub angle_bin: u8,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaskKey {
    pub bin: u8,
    pub width: u32,
    pub height: u32,
    pub signature: String,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct TtlLru<K: std::hash::Hash + Eq, V: Clone> {
    inner: LruCache<K, Entry<V>>,
    ttl: Duration,
}

impl<K: std::hash::Hash + Eq, V: Clone> TtlLru<K, V> {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
            ttl,
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let expired = match self.inner.peek(key) {
            Some(e) => e.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.inner.pop(key);
            return None;
        }
        self.inner.get(key).map(|e| e.value.clone())
    }

    fn put(&mut self, key: K, value: V) {
        self.inner.put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Raw RGBA pixel buffer for a full-frame tiled sheet, plus its dimensions.
#[derive(Clone)]
pub struct TileBuffer {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// 1-byte-per-pixel mask buffer.
#[derive(Clone)]
pub struct MaskBuffer {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// `tiles` + `masks` bounded LRUs from §4.2, plus the texture-configuration cache
/// from §4.6 keyed on `(threadThickness, hatch, densityScale)`.
pub struct Caches {
    tiles: Mutex<TtlLru<TileKey, TileBuffer>>,
    masks: Mutex<TtlLru<MaskKey, MaskBuffer>>,
    textures: Mutex<LruCache<TextureConfigKey, crate::texture::TextureSet>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureConfigKey {
    pub thread_thickness: u32,
    pub hatch: crate::options::Hatch,
    pub density_milli: i64,
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}

impl Caches {
    pub fn new() -> Self {
        Self {
            tiles: Mutex::new(TtlLru::new(TILES_CAPACITY, TILES_TTL)),
            masks: Mutex::new(TtlLru::new(MASKS_CAPACITY, MASKS_TTL)),
            textures: Mutex::new(LruCache::new(
                NonZeroUsize::new(TEXTURE_CONFIG_CAPACITY).unwrap(),
            )),
        }
    }

    pub fn get_tile(&self, key: &TileKey) -> Option<TileBuffer> {
        self.tiles.lock().unwrap().get(key)
    }

    pub fn put_tile(&self, key: TileKey, value: TileBuffer) {
        self.tiles.lock().unwrap().put(key, value);
    }

    pub fn get_mask(&self, key: &MaskKey) -> Option<MaskBuffer> {
        self.masks.lock().unwrap().get(key)
    }

    pub fn put_mask(&self, key: MaskKey, value: MaskBuffer) {
        self.masks.lock().unwrap().put(key, value);
    }

    pub fn get_texture_set(&self, key: &TextureConfigKey) -> Option<crate::texture::TextureSet> {
        self.textures.lock().unwrap().get(key).cloned()
    }

    pub fn put_texture_set(&self, key: TextureConfigKey, value: crate::texture::TextureSet) {
        self.textures.lock().unwrap().put(key, value);
    }
}
