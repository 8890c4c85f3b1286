//! Glyph atlas and rectangle allocator
//!
//! A single large single-channel texture packs many small glyph bitmaps so
//! the whole text pass binds one texture. Packing is a shelf/row allocator:
//! rectangles go left-to-right, wrap to a new row when the current one runs
//! out of width, and fail when the atlas runs out of height. No eviction,
//! no compaction, no growth.

use crate::{Result, TextError};

/// Padding in pixels around every glyph bitmap, preventing bilinear
/// filtering from bleeding neighboring glyphs into each other.
pub const ATLAS_PAD: u32 = 1;

/// A rectangle inside the atlas, in pixels (excluding padding)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row-based rectangle packer over a fixed-size 2D area.
///
/// The cursor only ever moves forward, so successfully allocated rectangles
/// can never overlap. Failed requests leave the cursor untouched.
#[derive(Debug, Clone)]
pub struct AtlasAllocator {
    width: u32,
    height: u32,
    pen_x: u32,
    pen_y: u32,
    row_height: u32,
}

impl AtlasAllocator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pen_x: 0,
            pen_y: 0,
            row_height: 0,
        }
    }

    /// Allocate a `width` x `height` rectangle, returning its top-left
    /// corner. `None` means the request can never be satisfied (zero-sized
    /// or larger than the atlas) or the atlas is exhausted.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        if width > self.width || height > self.height {
            return None;
        }

        // Compute the wrap tentatively so a failed request commits nothing.
        let (x, y, row_height) = if self.pen_x + width > self.width {
            (0, self.pen_y + self.row_height, 0)
        } else {
            (self.pen_x, self.pen_y, self.row_height)
        };

        if y + height > self.height {
            return None;
        }

        self.pen_x = x + width;
        self.pen_y = y;
        self.row_height = row_height.max(height);
        Some((x, y))
    }

    pub fn reset(&mut self) {
        self.pen_x = 0;
        self.pen_y = 0;
        self.row_height = 0;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The glyph atlas: a single 8-bit coverage bitmap plus its allocator and
/// a dirty flag tracking whether the GPU copy is stale.
pub struct GlyphAtlas {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    allocator: AtlasAllocator,
    dirty: bool,
}

impl GlyphAtlas {
    /// Default atlas dimensions
    pub const DEFAULT_SIZE: u32 = 2048;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; (width as usize) * (height as usize)],
            width,
            height,
            allocator: AtlasAllocator::new(width, height),
            // The initial all-zero contents still need one upload.
            dirty: true,
        }
    }

    /// Copy a glyph bitmap into the atlas, surrounded by [`ATLAS_PAD`]
    /// pixels of padding, and return the inner (unpadded) region.
    ///
    /// `bitmap` is tightly packed `width * height` coverage bytes.
    pub fn insert(&mut self, bitmap: &[u8], width: u32, height: u32) -> Result<AtlasRegion> {
        debug_assert!(bitmap.len() >= (width as usize) * (height as usize));

        let padded_w = width + 2 * ATLAS_PAD;
        let padded_h = height + 2 * ATLAS_PAD;
        let (x, y) = self
            .allocator
            .allocate(padded_w, padded_h)
            .ok_or(TextError::AtlasFull)?;

        let dst_x = (x + ATLAS_PAD) as usize;
        let dst_y = (y + ATLAS_PAD) as usize;
        let w = width as usize;

        for row in 0..height as usize {
            let dst = (dst_y + row) * self.width as usize + dst_x;
            let src = row * w;
            self.pixels[dst..dst + w].copy_from_slice(&bitmap[src..src + w]);
        }

        self.dirty = true;
        Ok(AtlasRegion {
            x: x + ATLAS_PAD,
            y: y + ATLAS_PAD,
            width,
            height,
        })
    }

    /// Normalized UV rectangle `[u0, v0, u1, v1]` for a region
    pub fn uv_rect(&self, region: AtlasRegion) -> [f32; 4] {
        [
            region.x as f32 / self.width as f32,
            region.y as f32 / self.height as f32,
            (region.x + region.width) as f32 / self.width as f32,
            (region.y + region.height) as f32 / self.height as f32,
        ]
    }

    /// Raw pixel data for GPU upload (row-major, one byte per pixel)
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the GPU copy of the atlas is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the atlas as uploaded
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drop all packed glyphs and restart packing from the origin
    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.allocator.reset();
        self.dirty = true;
    }
}
