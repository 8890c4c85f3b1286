//! Mesh building: shaped glyph runs to textured quads and caret tables
//!
//! For each text object the builder produces:
//! - a vertex list of two-triangle quads, one per glyph with ink,
//! - a byte-offset table mapping codepoint index to UTF-8 byte offset,
//! - a caret table mapping codepoint index to horizontal pen position.
//!
//! The caret table is what pointer hit-testing and selection rectangles are
//! computed from, so its invariants (length = codepoints + 1, starts at 0,
//! non-decreasing) are enforced with a forward-fill post-pass.

use bytemuck::{Pod, Zeroable};

use crate::atlas::GlyphAtlas;
use crate::cache::GlyphCache;
use crate::raster::Rasterizer;
use crate::shaper::ShapedGlyph;

/// One text vertex: position, atlas UV, packed RGBA color.
///
/// The per-vertex color lets a future pass color individual characters
/// without touching the shader uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Position relative to the object's pen origin (x, baseline y), y-down
    pub position: [f32; 2],
    /// Normalized atlas coordinates
    pub uv: [f32; 2],
    /// RGBA, unorm
    pub color: [u8; 4],
}

/// CPU-side geometry for one text object
#[derive(Debug, Clone, Default)]
pub struct TextGeometry {
    /// Glyph quads, 6 vertices each
    pub vertices: Vec<TextVertex>,
    /// Codepoint index -> horizontal pen position; `caret_x[0] == 0`,
    /// non-decreasing, length = codepoint count + 1. Empty only before the
    /// first build.
    pub caret_x: Vec<f32>,
    /// Codepoint index -> UTF-8 byte offset, with a trailing entry equal to
    /// the byte length
    pub byte_offsets: Vec<u32>,
}

impl TextGeometry {
    /// Advance width of the whole run
    pub fn width(&self) -> f32 {
        self.caret_x.last().copied().unwrap_or(0.0)
    }

    pub fn is_built(&self) -> bool {
        !self.caret_x.is_empty()
    }
}

/// Byte offset of every codepoint boundary plus the total byte length
pub fn byte_offset_table(text: &str) -> Vec<u32> {
    let mut offsets: Vec<u32> = text.char_indices().map(|(i, _)| i as u32).collect();
    offsets.push(text.len() as u32);
    offsets
}

/// Greatest codepoint index whose byte offset is <= `cluster`.
///
/// Shaper clusters are byte offsets into the source string; this maps them
/// back to codepoint indices.
pub fn codepoint_from_cluster(byte_offsets: &[u32], cluster: u32) -> usize {
    debug_assert!(!byte_offsets.is_empty());
    byte_offsets
        .partition_point(|&offset| offset <= cluster)
        .saturating_sub(1)
}

/// Build geometry for one shaped run.
///
/// Glyphs whose cache resolution fails (cache full, atlas exhausted,
/// rasterizer error) are skipped: they contribute no quad, but the pen
/// still advances and the rest of the run is processed, so one bad glyph
/// degrades to a gap instead of dropping the whole string.
pub fn build_geometry(
    text: &str,
    run: &[ShapedGlyph],
    color: [u8; 4],
    cache: &mut GlyphCache,
    atlas: &mut GlyphAtlas,
    rasterizer: &mut dyn Rasterizer,
) -> TextGeometry {
    let byte_offsets = byte_offset_table(text);
    let codepoints = byte_offsets.len() - 1;

    let mut geometry = TextGeometry {
        vertices: Vec::with_capacity(run.len() * 6),
        caret_x: vec![0.0; codepoints + 1],
        byte_offsets,
    };

    let mut pen_x = 0.0f32;
    let mut pen_y = 0.0f32;

    for glyph in run {
        match cache.resolve(glyph.glyph_id, atlas, rasterizer) {
            Ok(entry) => {
                if !entry.is_empty() {
                    // Atlas space grows downward while the font bearing is
                    // upward-positive, hence the subtraction.
                    let x0 = pen_x + glyph.x_offset + entry.bearing_x as f32;
                    let y0 = pen_y - glyph.y_offset - entry.bearing_y as f32;
                    let x1 = x0 + entry.width as f32;
                    let y1 = y0 + entry.height as f32;
                    push_quad(&mut geometry.vertices, x0, y0, x1, y1, entry.uv, color);
                }
            }
            Err(err) => {
                tracing::warn!(glyph_id = glyph.glyph_id, %err, "skipping glyph");
            }
        }

        pen_x += glyph.x_advance;
        pen_y += glyph.y_advance;

        // Caret position "after this cluster". Several glyphs can map to
        // the same cluster (ligatures, expansions); keep the furthest pen.
        let cp = codepoint_from_cluster(&geometry.byte_offsets, glyph.cluster);
        let after = (cp + 1).min(codepoints);
        geometry.caret_x[after] = geometry.caret_x[after].max(pen_x);
    }

    // Clusters are not guaranteed to be visited in pen order; forward-fill
    // so the table is non-decreasing end to end.
    for i in 1..geometry.caret_x.len() {
        geometry.caret_x[i] = geometry.caret_x[i].max(geometry.caret_x[i - 1]);
    }

    geometry
}

fn push_quad(
    vertices: &mut Vec<TextVertex>,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    uv: [f32; 4],
    color: [u8; 4],
) {
    let [u0, v0, u1, v1] = uv;
    let tl = TextVertex { position: [x0, y0], uv: [u0, v0], color };
    let tr = TextVertex { position: [x1, y0], uv: [u1, v0], color };
    let br = TextVertex { position: [x1, y1], uv: [u1, v1], color };
    let bl = TextVertex { position: [x0, y1], uv: [u0, v1], color };

    // Two triangles, 0-1-2 and 0-2-3, consistent winding.
    vertices.extend_from_slice(&[tl, tr, br, tl, br, bl]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterizedGlyph;
    use crate::Rasterizer;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    struct BoxRasterizer {
        size: u32,
    }

    impl Rasterizer for BoxRasterizer {
        fn rasterize(&mut self, _glyph_id: u32) -> crate::Result<RasterizedGlyph> {
            Ok(RasterizedGlyph {
                bitmap: vec![255; (self.size * self.size) as usize],
                width: self.size,
                height: self.size,
                bearing_x: 1,
                bearing_y: self.size as i32,
            })
        }
    }

    fn simple_glyph(glyph_id: u32, cluster: u32, advance: f32) -> ShapedGlyph {
        ShapedGlyph {
            glyph_id,
            cluster,
            x_advance: advance,
            y_advance: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    #[test]
    fn test_byte_offset_table_ascii_and_multibyte() {
        assert_eq!(byte_offset_table(""), vec![0]);
        assert_eq!(byte_offset_table("ab"), vec![0, 1, 2]);
        // 'é' is two bytes, '€' is three.
        assert_eq!(byte_offset_table("aé€"), vec![0, 1, 3, 6]);
    }

    #[test]
    fn test_codepoint_from_cluster() {
        let offsets = byte_offset_table("aé€");
        assert_eq!(codepoint_from_cluster(&offsets, 0), 0);
        assert_eq!(codepoint_from_cluster(&offsets, 1), 1);
        // Byte in the middle of a cluster maps back to its start.
        assert_eq!(codepoint_from_cluster(&offsets, 2), 1);
        assert_eq!(codepoint_from_cluster(&offsets, 3), 2);
        assert_eq!(codepoint_from_cluster(&offsets, 6), 3);
    }

    #[test]
    fn test_caret_table_invariants() {
        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = BoxRasterizer { size: 4 };

        let run = [
            simple_glyph(10, 0, 7.0),
            simple_glyph(11, 1, 6.0),
            simple_glyph(12, 2, 8.0),
        ];
        let geometry = build_geometry("abc", &run, WHITE, &mut cache, &mut atlas, &mut raster);

        assert_eq!(geometry.caret_x.len(), 4);
        assert_eq!(geometry.caret_x[0], 0.0);
        assert_eq!(geometry.caret_x, vec![0.0, 7.0, 13.0, 21.0]);
        assert!(geometry.caret_x.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(geometry.width(), 21.0);
    }

    #[test]
    fn test_ligature_shares_cluster() {
        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = BoxRasterizer { size: 4 };

        // One glyph covering "fi" (cluster 0), then "x" at byte 2.
        let run = [simple_glyph(30, 0, 10.0), simple_glyph(31, 2, 5.0)];
        let geometry = build_geometry("fix", &run, WHITE, &mut cache, &mut atlas, &mut raster);

        // The ligature's end position forward-fills the interior caret.
        assert_eq!(geometry.caret_x, vec![0.0, 10.0, 10.0, 15.0]);
    }

    #[test]
    fn test_out_of_order_clusters_stay_monotone() {
        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = BoxRasterizer { size: 4 };

        // Visual order disagrees with cluster order.
        let run = [simple_glyph(40, 1, 6.0), simple_glyph(41, 0, 6.0)];
        let geometry = build_geometry("ab", &run, WHITE, &mut cache, &mut atlas, &mut raster);

        assert!(geometry.caret_x.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*geometry.caret_x.last().unwrap(), 12.0);
    }

    #[test]
    fn test_quad_layout_and_color() {
        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = BoxRasterizer { size: 4 };

        let color = [10, 20, 30, 255];
        let run = [simple_glyph(50, 0, 5.0)];
        let geometry = build_geometry("a", &run, color, &mut cache, &mut atlas, &mut raster);

        assert_eq!(geometry.vertices.len(), 6);
        let v0 = geometry.vertices[0];
        // bearing_x = 1, bearing_y = 4: quad top-left is (1, -4).
        assert_eq!(v0.position, [1.0, -4.0]);
        assert_eq!(geometry.vertices[2].position, [5.0, 0.0]);
        assert!(geometry.vertices.iter().all(|v| v.color == color));
        // First triangle shares vertex 0 with the second.
        assert_eq!(geometry.vertices[0], geometry.vertices[3]);
    }

    #[test]
    fn test_failed_glyph_skips_but_run_continues() {
        struct FailOn {
            bad: u32,
            inner: BoxRasterizer,
        }
        impl Rasterizer for FailOn {
            fn rasterize(&mut self, glyph_id: u32) -> crate::Result<RasterizedGlyph> {
                if glyph_id == self.bad {
                    Err(crate::TextError::RasterizeError(glyph_id))
                } else {
                    self.inner.rasterize(glyph_id)
                }
            }
        }

        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = FailOn {
            bad: 11,
            inner: BoxRasterizer { size: 4 },
        };

        let run = [
            simple_glyph(10, 0, 7.0),
            simple_glyph(11, 1, 6.0),
            simple_glyph(12, 2, 8.0),
        ];
        let geometry = build_geometry("abc", &run, WHITE, &mut cache, &mut atlas, &mut raster);

        // Two quads instead of three, but the pen and carets are intact.
        assert_eq!(geometry.vertices.len(), 12);
        assert_eq!(geometry.caret_x, vec![0.0, 7.0, 13.0, 21.0]);
    }

    #[test]
    fn test_empty_text() {
        let mut atlas = GlyphAtlas::new(64, 64);
        let mut cache = GlyphCache::new(16);
        let mut raster = BoxRasterizer { size: 4 };

        let geometry = build_geometry("", &[], WHITE, &mut cache, &mut atlas, &mut raster);
        assert!(geometry.vertices.is_empty());
        assert_eq!(geometry.caret_x, vec![0.0]);
        assert!(geometry.is_built());
    }
}
