//! Glyph rasterization
//!
//! Converts glyph outlines to coverage bitmaps for the atlas. The
//! production backend uses swash; the [`Rasterizer`] trait is the seam the
//! glyph cache talks through, so tests and alternate backends can supply
//! deterministic bitmaps.

use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;
use swash::Setting;

use crate::font::FontFace;
use crate::{Result, TextError};

/// Rasterized glyph bitmap with placement metrics
#[derive(Debug, Clone, Default)]
pub struct RasterizedGlyph {
    /// Tightly packed 8-bit coverage, `width * height` bytes.
    /// Empty for ink-less glyphs such as space.
    pub bitmap: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the bitmap's left edge
    pub bearing_x: i32,
    /// Offset from the baseline up to the bitmap's top edge
    pub bearing_y: i32,
}

/// Turns glyph ids into coverage bitmaps
pub trait Rasterizer {
    fn rasterize(&mut self, glyph_id: u32) -> Result<RasterizedGlyph>;
}

/// Swash-backed rasterizer bound to one font face and pixel size
pub struct SwashRasterizer {
    font: FontFace,
    /// Swash scale context (caches scaling state across glyphs)
    context: ScaleContext,
}

impl SwashRasterizer {
    pub fn new(font: FontFace) -> Self {
        Self {
            font,
            context: ScaleContext::new(),
        }
    }
}

impl Rasterizer for SwashRasterizer {
    fn rasterize(&mut self, glyph_id: u32) -> Result<RasterizedGlyph> {
        let font_ref =
            swash::FontRef::from_index(self.font.data(), self.font.collection_index() as usize)
                .ok_or(TextError::InvalidFontData)?;

        let variations: Vec<Setting<f32>> = self
            .font
            .variations()
            .iter()
            .map(|axis| Setting {
                tag: swash::tag_from_bytes(&axis.tag),
                value: axis.value,
            })
            .collect();

        let mut scaler = self
            .context
            .builder(font_ref)
            .size(self.font.pixel_size() as f32)
            .variations(variations)
            .build();

        let mut render = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
        ]);
        render.format(Format::Alpha);

        let gid = u16::try_from(glyph_id).map_err(|_| TextError::RasterizeError(glyph_id))?;
        match render.render(&mut scaler, gid) {
            Some(img) => Ok(RasterizedGlyph {
                bitmap: img.data,
                width: img.placement.width,
                height: img.placement.height,
                bearing_x: img.placement.left,
                bearing_y: img.placement.top,
            }),
            // Ink-less glyph (like space): no bitmap, still a valid glyph.
            None => Ok(RasterizedGlyph::default()),
        }
    }
}

impl std::fmt::Debug for SwashRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashRasterizer")
            .field("font", &self.font)
            .finish()
    }
}
