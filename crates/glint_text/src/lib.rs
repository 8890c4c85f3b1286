//! Interactive text rendering core for the glint UI renderer
//!
//! This crate provides:
//! - Font loading and metrics (TTF/OTF via ttf-parser, variable fonts included)
//! - Text shaping (HarfBuzz via rustybuzz)
//! - Glyph rasterization (swash) into a shared single-channel atlas
//! - A bounded glyph cache with rasterize-on-miss
//! - Per-string quad meshes plus caret tables for pointer hit-testing
//! - A slot-based text object registry with selection state
//!
//! Everything here is CPU-side and single-threaded; the `glint_gpu` crate
//! consumes the meshes, atlas pixels, and dirty flags produced here.

pub mod atlas;
pub mod cache;
pub mod font;
pub mod mesh;
pub mod object;
pub mod raster;
pub mod shaper;
pub mod system;

pub use atlas::{AtlasAllocator, AtlasRegion, GlyphAtlas};
pub use cache::{GlyphCache, GlyphEntry};
pub use font::{FontFace, GlyphMetrics, LineMetrics, VariationAxis};
pub use mesh::{TextGeometry, TextVertex};
pub use object::{Dirty, TextHandle, TextObject, TextRegistry};
pub use raster::{RasterizedGlyph, Rasterizer, SwashRasterizer};
pub use shaper::{ShapedGlyph, Shaper, TextShaper};
pub use system::{SelectionInfo, TextSystem, TextSystemConfig};

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("Atlas is full, cannot allocate glyph")]
    AtlasFull,

    #[error("Glyph cache is full, cannot insert glyph {0}")]
    GlyphCacheFull(u32),

    #[error("Failed to rasterize glyph {0}")]
    RasterizeError(u32),
}

pub type Result<T> = std::result::Result<T, TextError>;
