//! Font face loading and metrics
//!
//! A [`FontFace`] owns the raw bytes of one font file (possibly a
//! collection), a collection index, optional variation-axis settings, and
//! the pixel size everything downstream renders at. The bytes are parsed
//! once at construction to validate the face and capture line metrics;
//! shaping and rasterization re-borrow the same bytes.

use std::sync::Arc;

use crate::{Result, TextError};

/// One variable-font axis setting, e.g. `(*b"wght", 500.0)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationAxis {
    /// Four-byte OpenType axis tag
    pub tag: [u8; 4],
    /// Design-space value
    pub value: f32,
}

impl VariationAxis {
    pub fn new(tag: [u8; 4], value: f32) -> Self {
        Self { tag, value }
    }
}

/// Font-wide vertical metrics in pixels at the face's pixel size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the line box (positive up)
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line box (positive magnitude)
    pub descent: f32,
    /// Extra leading between lines
    pub line_gap: f32,
}

impl LineMetrics {
    /// Total line-box height
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }
}

/// Metrics for a single nominal glyph, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    /// Glyph id for the queried codepoint (0 = missing glyph)
    pub glyph_id: u16,
    /// Horizontal advance
    pub advance: f32,
    /// Outline bounding box `[x_min, y_min, x_max, y_max]`, if any
    pub bounds: Option<[f32; 4]>,
}

/// An owned font face at a fixed pixel size
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    collection_index: u32,
    variations: Vec<VariationAxis>,
    pixel_size: u32,
    units_per_em: u16,
    metrics: LineMetrics,
}

impl FontFace {
    /// Parse a font face from raw file bytes.
    ///
    /// `collection_index` selects a face inside TTC/OTC files (0 for plain
    /// TTF/OTF). Variation settings are applied to metrics here and carried
    /// to shaping and rasterization. Fails when the bytes do not parse or
    /// the pixel size is zero.
    pub fn from_bytes(
        data: Vec<u8>,
        collection_index: u32,
        variations: Vec<VariationAxis>,
        pixel_size: u32,
    ) -> Result<Self> {
        if pixel_size == 0 {
            return Err(TextError::FontParseError("pixel size must be non-zero".into()));
        }
        if data.is_empty() {
            return Err(TextError::InvalidFontData);
        }

        let mut face = ttf_parser::Face::parse(&data, collection_index)
            .map_err(|e| TextError::FontParseError(e.to_string()))?;
        for axis in &variations {
            // Unknown axes are ignored, matching shaper behavior.
            let _ = face.set_variation(ttf_parser::Tag::from_bytes(&axis.tag), axis.value);
        }

        let units_per_em = face.units_per_em();
        let scale = pixel_size as f32 / units_per_em as f32;
        let ascent = face.ascender() as f32 * scale;
        // ttf-parser reports the descender as negative; keep the magnitude.
        let descent = -(face.descender() as f32) * scale;
        let line_gap = (face.line_gap() as f32 * scale).max(0.0);

        drop(face);
        Ok(Self {
            data: Arc::new(data),
            collection_index,
            variations,
            pixel_size,
            units_per_em,
            metrics: LineMetrics {
                ascent,
                descent,
                line_gap,
            },
        })
    }

    /// Raw font file bytes
    pub fn data(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    /// Face index inside a font collection
    pub fn collection_index(&self) -> u32 {
        self.collection_index
    }

    /// Variation-axis settings applied to this face
    pub fn variations(&self) -> &[VariationAxis] {
        &self.variations
    }

    /// Pixel size this face renders at
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Pixels per font unit
    pub fn scale(&self) -> f32 {
        self.pixel_size as f32 / self.units_per_em as f32
    }

    /// Font-wide line metrics in pixels
    pub fn line_metrics(&self) -> LineMetrics {
        self.metrics
    }

    /// Measure the nominal glyph for a single codepoint (no shaping).
    ///
    /// Useful for host-side caret width estimation. Returns `None` when the
    /// face has no glyph for the codepoint. Shaped runs should always be
    /// preferred for actual layout.
    pub fn measure(&self, c: char) -> Option<GlyphMetrics> {
        let mut face = ttf_parser::Face::parse(&self.data, self.collection_index).ok()?;
        for axis in &self.variations {
            let _ = face.set_variation(ttf_parser::Tag::from_bytes(&axis.tag), axis.value);
        }

        let glyph_id = face.glyph_index(c)?;
        let scale = self.scale();
        let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0) as f32 * scale;
        let bounds = face.glyph_bounding_box(glyph_id).map(|bb| {
            [
                bb.x_min as f32 * scale,
                bb.y_min as f32 * scale,
                bb.x_max as f32 * scale,
                bb.y_max as f32 * scale,
            ]
        });

        Some(GlyphMetrics {
            glyph_id: glyph_id.0,
            advance,
            bounds,
        })
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("bytes", &self.data.len())
            .field("collection_index", &self.collection_index)
            .field("variations", &self.variations)
            .field("pixel_size", &self.pixel_size)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_data() {
        let err = FontFace::from_bytes(Vec::new(), 0, Vec::new(), 32).unwrap_err();
        assert!(matches!(err, TextError::InvalidFontData));
    }

    #[test]
    fn test_rejects_garbage_data() {
        let err = FontFace::from_bytes(vec![0xde, 0xad, 0xbe, 0xef], 0, Vec::new(), 32).unwrap_err();
        assert!(matches!(err, TextError::FontParseError(_)));
    }

    #[test]
    fn test_rejects_zero_pixel_size() {
        let err = FontFace::from_bytes(vec![0u8; 16], 0, Vec::new(), 0).unwrap_err();
        assert!(matches!(err, TextError::FontParseError(_)));
    }

    #[test]
    fn test_line_height_sums_components() {
        let lm = LineMetrics {
            ascent: 10.0,
            descent: 3.0,
            line_gap: 1.0,
        };
        assert_eq!(lm.line_height(), 14.0);
    }
}
