//! The text system: registry operations, deferred rebuilds, hit-testing
//! and selection
//!
//! One [`TextSystem`] owns the font face, shaper, rasterizer, glyph cache,
//! atlas, and every text object. All operations are synchronous and
//! single-threaded; [`TextSystem::update`] is the per-frame CPU phase that
//! re-shapes dirty objects, after which the GPU layer uploads whatever is
//! flagged [`Dirty::NeedsUpload`] plus the atlas when it changed.

use crate::atlas::GlyphAtlas;
use crate::cache::GlyphCache;
use crate::font::{FontFace, LineMetrics, VariationAxis};
use crate::mesh::build_geometry;
use crate::object::{Dirty, TextHandle, TextObject, TextRegistry};
use crate::raster::{Rasterizer, SwashRasterizer};
use crate::shaper::{Shaper, TextShaper};
use crate::Result;

/// Construction parameters for a [`TextSystem`]
#[derive(Debug, Clone)]
pub struct TextSystemConfig {
    /// Complete font file bytes
    pub font_bytes: Vec<u8>,
    /// Face index for TTC/OTC collections
    pub collection_index: u32,
    /// Variable-font axis settings
    pub variations: Vec<VariationAxis>,
    /// Pixel size all text renders at
    pub pixel_size: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Bound on distinct glyphs; further misses draw nothing
    pub glyph_cache_capacity: usize,
}

impl Default for TextSystemConfig {
    fn default() -> Self {
        Self {
            font_bytes: Vec::new(),
            collection_index: 0,
            variations: Vec::new(),
            pixel_size: 16,
            atlas_width: GlyphAtlas::DEFAULT_SIZE,
            atlas_height: GlyphAtlas::DEFAULT_SIZE,
            glyph_cache_capacity: GlyphCache::DEFAULT_CAPACITY,
        }
    }
}

/// Snapshot of one object's selection state and geometry, for the UI layer
/// to draw carets and selection rectangles
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionInfo {
    pub handle: TextHandle,
    /// Object exists and has been shaped at least once
    pub valid: bool,
    pub selectable: bool,
    pub caret: usize,
    pub sel_a: usize,
    pub sel_b: usize,
    /// Line box in screen space: x0, y0, x1, y1
    pub bounds: [f32; 4],
    pub has_selection: bool,
    /// Selection rectangle in screen space (meaningful when `has_selection`)
    pub sel_x0: f32,
    pub sel_x1: f32,
    pub sel_y0: f32,
    pub sel_y1: f32,
}

/// Text shaping, caching, and hit-testing over a set of text objects
pub struct TextSystem {
    shaper: Box<dyn Shaper>,
    rasterizer: Box<dyn Rasterizer>,
    metrics: LineMetrics,
    atlas: GlyphAtlas,
    cache: GlyphCache,
    registry: TextRegistry,
}

impl TextSystem {
    /// Initialize from font bytes. Fails when the font does not parse;
    /// nothing usable is left behind on failure.
    pub fn new(config: TextSystemConfig) -> Result<Self> {
        let font = FontFace::from_bytes(
            config.font_bytes,
            config.collection_index,
            config.variations,
            config.pixel_size,
        )?;
        let metrics = font.line_metrics();

        tracing::info!(
            pixel_size = config.pixel_size,
            atlas_width = config.atlas_width,
            atlas_height = config.atlas_height,
            "text system initialized"
        );

        Ok(Self {
            shaper: Box::new(TextShaper::new(font.clone())),
            rasterizer: Box::new(SwashRasterizer::new(font)),
            metrics,
            atlas: GlyphAtlas::new(config.atlas_width, config.atlas_height),
            cache: GlyphCache::new(config.glyph_cache_capacity),
            registry: TextRegistry::new(),
        })
    }

    /// Build a system around custom shaping/rasterization backends.
    ///
    /// Used by alternate font engines and by tests, which inject
    /// deterministic synthetic engines.
    pub fn with_engines(
        shaper: Box<dyn Shaper>,
        rasterizer: Box<dyn Rasterizer>,
        metrics: LineMetrics,
        atlas_width: u32,
        atlas_height: u32,
        glyph_cache_capacity: usize,
    ) -> Self {
        Self {
            shaper,
            rasterizer,
            metrics,
            atlas: GlyphAtlas::new(atlas_width, atlas_height),
            cache: GlyphCache::new(glyph_cache_capacity),
            registry: TextRegistry::new(),
        }
    }

    // ----- Object lifecycle -----

    pub fn create_text(&mut self) -> TextHandle {
        self.registry.create()
    }

    pub fn destroy_text(&mut self, handle: TextHandle) {
        self.registry.destroy(handle);
    }

    /// Replace an object's content. The mesh rebuild is deferred to
    /// [`update`](Self::update) so a frame's worth of edits batches into
    /// one pass.
    pub fn set_text(&mut self, handle: TextHandle, text: &str) {
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.text.clear();
            obj.text.push_str(text);
            obj.dirty = Dirty::NeedsRebuild;
        }
    }

    /// Move an object. Position is a draw-time translate, so no rebuild.
    pub fn set_position(&mut self, handle: TextHandle, x: f32, baseline_y: f32) {
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.x = x;
            obj.baseline_y = baseline_y;
        }
    }

    /// Change an object's solid color. The color rides in the vertex
    /// stream, so the mesh is rebuilt.
    pub fn set_color(&mut self, handle: TextHandle, rgba: [f32; 4]) {
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.color = rgba;
            obj.dirty = Dirty::NeedsRebuild;
        }
    }

    pub fn set_selectable(&mut self, handle: TextHandle, selectable: bool) {
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.selectable = selectable;
        }
    }

    pub fn get(&self, handle: TextHandle) -> Option<&TextObject> {
        self.registry.get(handle)
    }

    // ----- Per-frame maintenance -----

    /// Rebuild every live object flagged [`Dirty::NeedsRebuild`] and flag
    /// the result for GPU upload. Call once per frame before drawing.
    pub fn update(&mut self) {
        let shaper = &mut self.shaper;
        let rasterizer = &mut self.rasterizer;
        for (_, obj) in self.registry.iter_mut() {
            if obj.dirty != Dirty::NeedsRebuild {
                continue;
            }
            let run = shaper.shape(&obj.text);
            obj.geometry = build_geometry(
                &obj.text,
                &run,
                obj.packed_color(),
                &mut self.cache,
                &mut self.atlas,
                rasterizer.as_mut(),
            );
            obj.dirty = Dirty::NeedsUpload;
        }
    }

    /// Live objects in slot order, with mutable dirty state, for the GPU
    /// layer's upload pass
    pub fn objects_mut(&mut self) -> impl Iterator<Item = (TextHandle, &mut TextObject)> {
        self.registry.iter_mut()
    }

    /// Live objects in slot order
    pub fn objects(&self) -> impl Iterator<Item = (TextHandle, &TextObject)> {
        self.registry.iter()
    }

    /// Total slots ever created (dead ones included); sizes GPU-side arrays
    pub fn slot_count(&self) -> usize {
        self.registry.slot_count()
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut GlyphAtlas {
        &mut self.atlas
    }

    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// Font-wide line metrics used for line boxes
    pub fn line_metrics(&self) -> LineMetrics {
        self.metrics
    }

    /// Destroy all objects and drop all cached glyphs; the shutdown /
    /// re-init path. Shaping and font state survive.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.cache.clear();
        self.atlas.clear();
    }

    // ----- Hit-testing & selection -----

    /// Find the topmost live, selectable, shaped object containing the
    /// point. Objects draw in slot order, so on overlap the highest live
    /// slot wins.
    pub fn hit_test(&self, x: f32, y: f32) -> TextHandle {
        let mut hit = TextHandle::INVALID;
        for (handle, obj) in self.registry.iter() {
            if !obj.selectable || !obj.geometry.is_built() {
                continue;
            }
            let x0 = obj.x;
            let x1 = obj.x + obj.geometry.width();
            let y0 = obj.baseline_y - self.metrics.ascent;
            let y1 = obj.baseline_y + self.metrics.descent;
            if x >= x0 && x <= x1 && y >= y0 && y <= y1 {
                hit = handle;
            }
        }
        hit
    }

    /// Caret index for a point, or `None` when the point misses the
    /// object's line box vertically
    pub fn caret_from_point(&self, handle: TextHandle, x: f32, y: f32) -> Option<usize> {
        let obj = self.selectable_object(handle)?;
        let y0 = obj.baseline_y - self.metrics.ascent;
        let y1 = obj.baseline_y + self.metrics.descent;
        if y < y0 || y > y1 {
            return None;
        }
        Some(caret_index_from_local_x(&obj.geometry.caret_x, x - obj.x))
    }

    /// Caret index for a horizontal position only; drags may leave the
    /// vertical band without dropping the selection.
    pub fn caret_from_point_ignore_y(&self, handle: TextHandle, x: f32) -> Option<usize> {
        let obj = self.selectable_object(handle)?;
        Some(caret_index_from_local_x(&obj.geometry.caret_x, x - obj.x))
    }

    /// Start a selection drag at the point. Re-entrant: calling again
    /// simply resets the anchor.
    pub fn begin_selection(&mut self, handle: TextHandle, x: f32, y: f32) {
        let Some(caret) = self.caret_from_point(handle, x, y) else {
            return;
        };
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.selecting = true;
            obj.sel_a = caret;
            obj.sel_b = caret;
            obj.caret = caret;
        }
    }

    /// Extend an in-progress drag. Ignored unless
    /// [`begin_selection`](Self::begin_selection) succeeded first.
    pub fn update_selection(&mut self, handle: TextHandle, x: f32, _y: f32) {
        if !self.registry.get(handle).is_some_and(|o| o.selecting) {
            return;
        }
        let Some(caret) = self.caret_from_point_ignore_y(handle, x) else {
            return;
        };
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.sel_b = caret;
            obj.caret = caret;
        }
    }

    /// Finish a drag. The caret and selection endpoints persist until the
    /// next interaction.
    pub fn end_selection(&mut self, handle: TextHandle) {
        if let Some(obj) = self.registry.get_mut(handle) {
            obj.selecting = false;
        }
    }

    /// Selection snapshot for the UI layer
    pub fn selection_info(&self, handle: TextHandle) -> SelectionInfo {
        let mut info = SelectionInfo {
            handle,
            ..SelectionInfo::default()
        };

        let Some(obj) = self.registry.get(handle) else {
            return info;
        };

        info.valid = obj.geometry.is_built();
        info.selectable = obj.selectable;
        info.caret = obj.caret;
        info.sel_a = obj.sel_a;
        info.sel_b = obj.sel_b;
        if !info.valid {
            return info;
        }

        let y0 = obj.baseline_y - self.metrics.ascent;
        let y1 = obj.baseline_y + self.metrics.descent;
        info.bounds = [obj.x, y0, obj.x + obj.geometry.width(), y1];

        let lo = obj.sel_a.min(obj.sel_b);
        let hi = obj.sel_a.max(obj.sel_b);
        if hi > lo {
            let last = obj.geometry.caret_x.len() - 1;
            let lo = lo.min(last);
            let hi = hi.min(last);
            info.has_selection = true;
            info.sel_x0 = obj.x + obj.geometry.caret_x[lo];
            info.sel_x1 = obj.x + obj.geometry.caret_x[hi];
            info.sel_y0 = y0;
            info.sel_y1 = y1;
        }
        info
    }

    fn selectable_object(&self, handle: TextHandle) -> Option<&TextObject> {
        let obj = self.registry.get(handle)?;
        (obj.selectable && obj.geometry.is_built()).then_some(obj)
    }
}

impl std::fmt::Debug for TextSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSystem")
            .field("objects", &self.registry.live_count())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Nearest caret boundary to a local x position. Of the two bracketing
/// boundaries, the numerically closer one wins; ties go to the lower index.
fn caret_index_from_local_x(caret_x: &[f32], local_x: f32) -> usize {
    if caret_x.is_empty() {
        return 0;
    }
    if local_x <= caret_x[0] {
        return 0;
    }
    if local_x >= *caret_x.last().unwrap() {
        return caret_x.len() - 1;
    }

    let upper = caret_x.partition_point(|&c| c < local_x);
    let lower = upper - 1;
    if local_x - caret_x[lower] <= caret_x[upper] - local_x {
        lower
    } else {
        upper
    }
}
