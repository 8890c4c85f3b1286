//! Text shaping via rustybuzz
//!
//! Turns a UTF-8 string into a positioned glyph run. Output advances and
//! offsets are already converted from font units to pixels. The [`Shaper`]
//! trait is the seam the mesh builder consumes, so tests can feed synthetic
//! runs without a font file.

use crate::font::FontFace;

/// One shaped glyph, in visual order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    /// Font-specific glyph id chosen by the shaper
    pub glyph_id: u32,
    /// Byte offset into the source string this glyph maps back to
    pub cluster: u32,
    /// Pen advance after this glyph, in pixels
    pub x_advance: f32,
    pub y_advance: f32,
    /// Offset applied to this glyph's quad without moving the pen
    pub x_offset: f32,
    pub y_offset: f32,
}

/// Shapes UTF-8 text into a glyph run
pub trait Shaper {
    fn shape(&mut self, text: &str) -> Vec<ShapedGlyph>;
}

/// HarfBuzz (rustybuzz) shaper bound to one font face.
///
/// Shaping is left-to-right with monotone character clusters, so clusters
/// can be mapped back to codepoint indices with a binary search over the
/// string's byte-offset table.
pub struct TextShaper {
    font: FontFace,
}

impl TextShaper {
    pub fn new(font: FontFace) -> Self {
        Self { font }
    }
}

impl Shaper for TextShaper {
    fn shape(&mut self, text: &str) -> Vec<ShapedGlyph> {
        if text.is_empty() {
            return Vec::new();
        }

        let Some(mut face) =
            rustybuzz::Face::from_slice(self.font.data(), self.font.collection_index())
        else {
            // The face parsed at init; hitting this means the bytes changed
            // under us, which the ownership model rules out.
            tracing::error!("rustybuzz rejected font face during shaping");
            return Vec::new();
        };

        let variations: Vec<rustybuzz::Variation> = self
            .font
            .variations()
            .iter()
            .map(|axis| rustybuzz::Variation {
                tag: rustybuzz::ttf_parser::Tag::from_bytes(&axis.tag),
                value: axis.value,
            })
            .collect();
        face.set_variations(&variations);

        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(rustybuzz::Direction::LeftToRight);
        buffer.set_cluster_level(rustybuzz::BufferClusterLevel::MonotoneCharacters);
        buffer.guess_segment_properties();

        let output = rustybuzz::shape(&face, &[], buffer);
        let scale = self.font.scale();

        output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_id: info.glyph_id,
                cluster: info.cluster,
                x_advance: pos.x_advance as f32 * scale,
                y_advance: pos.y_advance as f32 * scale,
                x_offset: pos.x_offset as f32 * scale,
                y_offset: pos.y_offset as f32 * scale,
            })
            .collect()
    }
}

impl std::fmt::Debug for TextShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextShaper").field("font", &self.font).finish()
    }
}
