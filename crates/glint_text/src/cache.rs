//! Bounded glyph cache with rasterize-on-miss
//!
//! Maps shaping-engine glyph ids to their atlas placement. Entries are
//! inserted on first use and never individually evicted; the cache is only
//! ever cleared wholesale. When the bound is reached further misses fail,
//! and the affected glyph simply draws nothing.

use rustc_hash::FxHashMap;

use crate::atlas::GlyphAtlas;
use crate::raster::Rasterizer;
use crate::{Result, TextError};

/// Atlas placement and metrics for one rasterized glyph.
///
/// Glyph ids are font- and shaper-specific, so entries are only meaningful
/// for the font face this cache was filled from. Ink-less glyphs (space)
/// have zero width/height and a zero UV rect but are still cached, so later
/// lookups are hits instead of repeated rasterization attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphEntry {
    /// Normalized atlas UV rectangle `[u0, v0, u1, v1]`
    pub uv: [f32; 4],
    /// Bitmap size in pixels (0 for ink-less glyphs)
    pub width: u32,
    pub height: u32,
    /// Offset from pen position to the bitmap's left edge
    pub bearing_x: i32,
    /// Offset from baseline up to the bitmap's top edge
    pub bearing_y: i32,
}

impl GlyphEntry {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Insertion-only glyph cache keyed by glyph id
pub struct GlyphCache {
    entries: FxHashMap<u32, GlyphEntry>,
    capacity: usize,
    /// Number of rasterizations performed since creation (test observability)
    rasterized: u64,
}

impl GlyphCache {
    pub const DEFAULT_CAPACITY: usize = 512;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            capacity,
            rasterized: 0,
        }
    }

    /// Look up a glyph, rasterizing and packing it into the atlas on miss.
    ///
    /// Failures (cache at capacity, atlas exhausted, rasterizer error) leave
    /// both the cache and the atlas cursor untouched, so unrelated glyphs
    /// keep working.
    pub fn resolve(
        &mut self,
        glyph_id: u32,
        atlas: &mut GlyphAtlas,
        rasterizer: &mut dyn Rasterizer,
    ) -> Result<GlyphEntry> {
        if let Some(entry) = self.entries.get(&glyph_id) {
            return Ok(*entry);
        }

        if self.entries.len() >= self.capacity {
            return Err(TextError::GlyphCacheFull(glyph_id));
        }

        let glyph = rasterizer.rasterize(glyph_id)?;
        self.rasterized += 1;

        let entry = if glyph.width == 0 || glyph.height == 0 {
            GlyphEntry {
                uv: [0.0; 4],
                width: 0,
                height: 0,
                bearing_x: glyph.bearing_x,
                bearing_y: glyph.bearing_y,
            }
        } else {
            let region = atlas.insert(&glyph.bitmap, glyph.width, glyph.height)?;
            GlyphEntry {
                uv: atlas.uv_rect(region),
                width: glyph.width,
                height: glyph.height,
                bearing_x: glyph.bearing_x,
                bearing_y: glyph.bearing_y,
            }
        };

        self.entries.insert(glyph_id, entry);
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of rasterizer invocations so far
    pub fn rasterization_count(&self) -> u64 {
        self.rasterized
    }

    /// Drop every entry. The atlas must be cleared alongside, since the
    /// dropped entries' pixels are not reclaimed individually.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
